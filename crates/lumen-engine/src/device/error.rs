use std::sync::Arc;

use thiserror::Error;

/// Failure to bring up the render engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no suitable GPU adapter: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to create GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("shader module `{label}` failed to compile: {message}")]
    ShaderModule { label: &'static str, message: String },

    #[error("failed to start the completion poller: {0}")]
    Poller(#[source] std::io::Error),

    #[error("failed to start the frame presenter: {0}")]
    Presenter(#[source] std::io::Error),
}

/// The engine failed to initialize earlier; the captured error is shared by
/// every consumer.
#[derive(Debug, Clone, Error)]
#[error("render engine unavailable: {0}")]
pub struct EngineUnavailable(pub Arc<EngineError>);

/// Rejected texture or buffer upload.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum UploadError {
    #[error("no data to upload")]
    Empty,

    #[error("{width}x{height} texture needs {expected} bytes, got {actual}")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: u64,
        actual: u64,
    },

    #[error("{width}x{height} texture exceeds the device limit of {max} texels per side")]
    TextureTooLarge { width: u32, height: u32, max: u32 },

    #[error("buffer of {size} bytes exceeds the device limit of {max} bytes")]
    BufferTooLarge { size: u64, max: u64 },
}

/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM); the view should be torn down.
    Fatal,
}
