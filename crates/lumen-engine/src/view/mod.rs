//! Surface-bound views.
//!
//! A `CanvasView` is the single entry point platform glue talks to: it owns
//! the surface, a `CanvasRenderer` and a `FrameClock`.

mod canvas_view;

pub use canvas_view::{CanvasView, FrameInfo, FrameListener, ViewConfig, ViewFrame};
