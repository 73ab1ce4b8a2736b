//! Pipeline cache and the mesh pipeline variants it stores.

mod cache;
mod mesh;

pub use cache::{PipelineCache, PipelineKey, PipelineState};
pub use mesh::MeshPipelines;

pub(crate) use mesh::MeshPipelineCompiler;
