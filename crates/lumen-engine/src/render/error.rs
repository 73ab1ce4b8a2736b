use thiserror::Error;

use crate::device::EngineUnavailable;

/// Failure to build the pipelines for one format pair.
///
/// Stored in the pipeline cache; frames for that pair render clear-only
/// until the entry is retried.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("format {format:?} cannot be used here: {reason}")]
    UnsupportedFormat {
        format: wgpu::TextureFormat,
        reason: String,
    },

    #[error("{variant} pipeline failed: {message}")]
    Shader { variant: &'static str, message: String },

    #[error("pipeline validation failed: {0}")]
    Validation(String),

    #[error("could not start pipeline compilation: {0}")]
    Spawn(String),

    #[error("pipeline compilation panicked: {0}")]
    Panicked(String),
}

/// Failure to create a renderer.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    EngineUnavailable(#[from] EngineUnavailable),
}
