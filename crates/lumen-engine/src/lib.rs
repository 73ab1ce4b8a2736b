//! Lumen engine crate.
//!
//! Frame-paced rendering of a retained 3D canvas onto wgpu surfaces:
//! - `device`: adapter/device bring-up, uploads, completion polling
//! - `render`: the per-frame pipeline (`CanvasRenderer`)
//! - `uniform`: per-frame uniform rings
//! - `scene`: canvas, camera and mesh instances
//! - `time`: fixed and variable rate frame clocks
//! - `view`: a surface bound to a renderer and a clock
//! - `input`: timestamped input queue

pub mod device;
pub mod input;
pub mod logging;
pub mod render;
pub mod scene;
pub mod time;
pub mod uniform;
pub mod view;
