/// Initialization parameters for the render engine.
///
/// Surface-related choices (format, present mode) live in `ViewConfig`; the
/// engine itself is not bound to any surface.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Backends wgpu may pick an adapter from.
    pub backends: wgpu::Backends,

    pub power_preference: wgpu::PowerPreference,

    /// Accept only a software adapter. Useful for CI.
    pub force_fallback_adapter: bool,

    /// Required wgpu features.
    ///
    /// Depth formats with a 32-bit float depth and stencil need
    /// `DEPTH32FLOAT_STENCIL8` here.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,

    pub memory_hints: wgpu::MemoryHints,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::Performance,
        }
    }
}
