//! Frame-paced canvas rendering.
//!
//! `CanvasRenderer` drives one frame at a time:
//! - waits on the `FrameGate` so at most N frames are queued on the GPU
//! - writes the frame's uniforms and records a `FramePlan`
//! - encodes the plan against cached pipelines for the drawable's format
//! - submits, hands the gate permit to the completion callback, presents
//!
//! Convention: right-handed world space, counter-clockwise front faces,
//! depth 0..1 with nearer fragments winning.

mod depth;
mod drawable;
mod error;
mod gate;
pub mod pipeline;
mod plan;
mod renderer;

pub use depth::depth_stencil_state;
pub use drawable::{Drawable, OffscreenTarget, SurfaceFrame};
pub use error::{PipelineError, RenderError};
pub use gate::{FrameGate, FramePermit};
pub use plan::{FramePlan, PassCommand};
pub use renderer::{
    AbortReason, CanvasRenderer, FrameOutcome, FrameStats, FrameTiming, RendererConfig, SkipReason,
};
