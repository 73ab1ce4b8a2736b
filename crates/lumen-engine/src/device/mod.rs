//! GPU device management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue (`RenderEngine`)
//! - capturing the initialization outcome once (`EngineContext`)
//! - uploading application textures and vertex data
//! - polling the device so completion callbacks fire
//! - presenting drawables at their target time off the render thread
//! - surface configuration helpers used by views

mod context;
mod engine;
mod error;
mod init;
mod poll;
mod present;
pub(crate) mod surface;
mod upload;

pub use context::EngineContext;
pub use engine::RenderEngine;
pub use error::{EngineError, EngineUnavailable, SurfaceErrorAction, UploadError};
pub use init::EngineConfig;
pub use upload::TEXTURE_BYTES_PER_TEXEL;

pub(crate) use engine::EngineLayouts;
