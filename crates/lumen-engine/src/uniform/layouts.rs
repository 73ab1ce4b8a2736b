//! Uniform records shared with `render/shaders/mesh.wgsl`.
//!
//! Field order and padding must match the WGSL structs exactly.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Per-instance record for opaque and shaded meshes.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct MeshUniform {
    pub model: [[f32; 4]; 4],
}

impl MeshUniform {
    pub fn new(model: Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
        }
    }
}

impl Default for MeshUniform {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY)
    }
}

/// Per-instance record for weighted meshes: two model matrices blended by
/// per-vertex weights in the vertex stage.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct WeightedMeshUniform {
    pub model0: [[f32; 4]; 4],
    pub model1: [[f32; 4]; 4],
}

impl WeightedMeshUniform {
    pub fn new(model0: Mat4, model1: Mat4) -> Self {
        Self {
            model0: model0.to_cols_array_2d(),
            model1: model1.to_cols_array_2d(),
        }
    }
}

impl Default for WeightedMeshUniform {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Mat4::IDENTITY)
    }
}

/// Per-frame scene record. Written at index 0 of the scene ring.
///
/// `ambient` is a `vec3<f32>`, which WGSL aligns to 16 bytes; the trailing
/// pad keeps the struct size at a multiple of 16.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SceneUniform {
    pub view_projection: [[f32; 4]; 4],
    pub ambient: [f32; 3],
    pub _pad: f32,
}

impl SceneUniform {
    pub fn new(view_projection: Mat4, ambient: Vec3) -> Self {
        Self {
            view_projection: view_projection.to_cols_array_2d(),
            ambient: ambient.to_array(),
            _pad: 0.0,
        }
    }
}

impl Default for SceneUniform {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Vec3::ONE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_match_wgsl() {
        assert_eq!(std::mem::size_of::<MeshUniform>(), 64);
        assert_eq!(std::mem::size_of::<WeightedMeshUniform>(), 128);
        assert_eq!(std::mem::size_of::<SceneUniform>(), 80);
    }

    #[test]
    fn matrices_are_column_major() {
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let u = MeshUniform::new(m);
        assert_eq!(u.model[3], [1.0, 2.0, 3.0, 1.0]);
    }
}
