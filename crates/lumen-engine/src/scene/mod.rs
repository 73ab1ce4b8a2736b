//! Scene data model.
//!
//! A `Canvas` is plain data owned by the application. Renderers only read it.

mod camera;
mod canvas;
mod mesh;

pub use camera::{Camera, MAX_PIVOT_DISTANCE, MIN_PIVOT_DISTANCE};
pub use canvas::{Canvas, MeshInstance, SharedCanvas};
pub use mesh::{Geometry, Mesh, MeshKind, OpaqueVertex, ShadedVertex, WeightedVertex};

#[cfg(test)]
pub(crate) use mesh::test_support;
