//! Multi-buffered uniform storage.
//!
//! A renderer owns one `FrameCounter` and several `UniformRing`s (one per
//! record type). Each frame the counter advances once, the rings are written
//! on the host, and their `GpuUniformRing` mirrors upload what changed.

mod counter;
mod gpu;
mod layouts;
mod ring;

pub use counter::FrameCounter;
pub use gpu::GpuUniformRing;
pub use layouts::{MeshUniform, SceneUniform, WeightedMeshUniform};
pub use ring::{UniformRing, MIN_STEP};

