use std::sync::Once;

/// Filter applied when neither the config nor `RUST_LOG` provides one.
pub const DEFAULT_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn";

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info", "warn",
/// "lumen_engine=debug,wgpu=warn").
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
    /// Include the module path of each record.
    pub module_path: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
            module_path: true,
        }
    }
}

static INIT: Once = Once::new();

/// Resolves the filter string: explicit config, then `RUST_LOG`, then
/// `DEFAULT_FILTER`.
pub fn resolve_filter(config: &LoggingConfig, rust_log: Option<&str>) -> String {
    config
        .env_filter
        .as_deref()
        .or(rust_log)
        .filter(|f| !f.trim().is_empty())
        .unwrap_or(DEFAULT_FILTER)
        .to_owned()
}

/// Initializes the global logger once. Later calls are ignored.
///
/// Uses `try_init` so a logger installed by the host application wins.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let rust_log = std::env::var("RUST_LOG").ok();
        let filter = resolve_filter(&config, rust_log.as_deref());

        let mut builder = env_logger::Builder::new();
        builder
            .parse_filters(&filter)
            .write_style(config.write_style)
            .format_module_path(config.module_path);

        if builder.try_init().is_err() {
            return;
        }
        log::debug!("logging initialized ({filter})");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_filter_wins() {
        let config = LoggingConfig {
            env_filter: Some("lumen_engine=trace".into()),
            ..Default::default()
        };
        assert_eq!(resolve_filter(&config, Some("warn")), "lumen_engine=trace");
    }

    #[test]
    fn falls_back_to_rust_log_then_default() {
        let config = LoggingConfig::default();
        assert_eq!(resolve_filter(&config, Some("debug")), "debug");
        assert_eq!(resolve_filter(&config, None), DEFAULT_FILTER);
        assert_eq!(resolve_filter(&config, Some("  ")), DEFAULT_FILTER);
    }

    #[test]
    fn init_is_idempotent() {
        init_logging(LoggingConfig::default());
        init_logging(LoggingConfig::default());
    }
}
