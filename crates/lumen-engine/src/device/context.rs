use std::sync::Arc;

use super::{EngineConfig, EngineError, EngineUnavailable, RenderEngine};

/// Result of bringing up the render engine, captured once.
///
/// Renderers and views take the context rather than the engine, so an
/// initialization failure is reported to each of them without ever running
/// initialization again.
#[derive(Clone)]
pub struct EngineContext {
    engine: Result<Arc<RenderEngine>, Arc<EngineError>>,
}

impl EngineContext {
    /// Creates the engine and captures the outcome.
    pub fn initialize(config: EngineConfig) -> Self {
        let engine = match RenderEngine::new(config) {
            Ok(engine) => Ok(Arc::new(engine)),
            Err(err) => {
                log::error!("render engine initialization failed: {err}");
                Err(Arc::new(err))
            }
        };
        Self { engine }
    }

    /// Wraps an engine created elsewhere.
    pub fn from_engine(engine: Arc<RenderEngine>) -> Self {
        Self { engine: Ok(engine) }
    }

    /// Wraps an initialization failure.
    pub fn from_error(error: EngineError) -> Self {
        Self {
            engine: Err(Arc::new(error)),
        }
    }

    pub fn engine(&self) -> Result<&Arc<RenderEngine>, EngineUnavailable> {
        self.engine
            .as_ref()
            .map_err(|err| EngineUnavailable(err.clone()))
    }

    /// The captured initialization error, if any.
    pub fn error(&self) -> Option<&EngineError> {
        self.engine.as_ref().err().map(|e| e.as_ref())
    }

    pub fn is_available(&self) -> bool {
        self.engine.is_ok()
    }
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.engine {
            Ok(_) => f.write_str("EngineContext(ready)"),
            Err(err) => write!(f, "EngineContext(failed: {err})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed() -> EngineContext {
        EngineContext::from_error(EngineError::ShaderModule {
            label: "test",
            message: "boom".into(),
        })
    }

    #[test]
    fn failure_is_reported_to_every_consumer() {
        let ctx = failed();
        let other = ctx.clone();

        assert!(!ctx.is_available());
        let (Err(a), Err(b)) = (ctx.engine(), other.engine()) else {
            panic!("a failed context must not hand out an engine");
        };
        assert!(Arc::ptr_eq(&a.0, &b.0));
        assert!(a.to_string().contains("boom"));
    }

    #[test]
    fn error_is_exposed() {
        let ctx = failed();
        assert!(matches!(ctx.error(), Some(EngineError::ShaderModule { .. })));
    }
}
