use bytemuck::{Pod, Zeroable};

/// Which category of the canvas a mesh is drawn in.
///
/// Each kind has its own vertex layout and pipeline variant.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MeshKind {
    Opaque,
    Shaded,
    Weighted,
}

impl MeshKind {
    pub const ALL: [MeshKind; 3] = [MeshKind::Opaque, MeshKind::Shaded, MeshKind::Weighted];

    /// Bytes per vertex in this kind's vertex buffer.
    pub const fn vertex_stride(self) -> u64 {
        match self {
            MeshKind::Opaque => std::mem::size_of::<OpaqueVertex>() as u64,
            MeshKind::Shaded => std::mem::size_of::<ShadedVertex>() as u64,
            MeshKind::Weighted => std::mem::size_of::<WeightedVertex>() as u64,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MeshKind::Opaque => "opaque",
            MeshKind::Shaded => "shaded",
            MeshKind::Weighted => "weighted",
        }
    }

    pub(crate) fn vertex_layout(self) -> wgpu::VertexBufferLayout<'static> {
        let attributes: &'static [wgpu::VertexAttribute] = match self {
            MeshKind::Opaque => &OPAQUE_ATTRS,
            MeshKind::Shaded => &SHADED_ATTRS,
            MeshKind::Weighted => &WEIGHTED_ATTRS,
        };
        wgpu::VertexBufferLayout {
            array_stride: self.vertex_stride(),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        }
    }
}

const OPAQUE_ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
    0 => Float32x3, // position
    1 => Float32x2, // uv
    2 => Float32x3, // normal
];

const SHADED_ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
    0 => Float32x3, // position
    1 => Float32x2, // uv
    2 => Float32,   // shade
];

const WEIGHTED_ATTRS: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
    0 => Float32x3, // position
    1 => Float32x2, // uv
    2 => Float32x3, // normal
    3 => Float32x3, // offset applied before the second transform
    4 => Float32,   // weight0
    5 => Float32,   // weight1
];

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct OpaqueVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub normal: [f32; 3],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct ShadedVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub shade: f32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct WeightedVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub normal: [f32; 3],
    pub offset: [f32; 3],
    pub weight0: f32,
    pub weight1: f32,
}

/// Geometry referenced by mesh instances.
///
/// `Mesh` is the GPU implementation; the trait lets scene logic and frame
/// recording run without a device.
pub trait Geometry: Send + Sync {
    fn vertex_count(&self) -> u32;

    /// Byte length of the vertex data.
    fn vertex_bytes(&self) -> u64;

    /// Whether the vertex data holds `vertex_count` vertices of `kind`.
    fn fits(&self, kind: MeshKind) -> bool {
        u64::from(self.vertex_count())
            .checked_mul(kind.vertex_stride())
            .is_some_and(|needed| needed <= self.vertex_bytes())
    }
}

/// Immutable GPU geometry: a vertex buffer and the texture sampled by it.
///
/// Built with `RenderEngine::create_mesh`. Shared between instances through
/// `Arc<Mesh>`.
#[derive(Debug)]
pub struct Mesh {
    pub(crate) vertex_buffer: wgpu::Buffer,
    pub(crate) vertex_count: u32,
    pub(crate) texture: wgpu::Texture,
    pub(crate) texture_bind_group: wgpu::BindGroup,
}

impl Mesh {
    pub fn vertex_buffer(&self) -> &wgpu::Buffer {
        &self.vertex_buffer
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub(crate) fn texture_bind_group(&self) -> &wgpu::BindGroup {
        &self.texture_bind_group
    }
}

impl Geometry for Mesh {
    fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    fn vertex_bytes(&self) -> u64 {
        self.vertex_buffer.size()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// CPU-only geometry used by scene and recording tests.
    #[derive(Debug, Clone, PartialEq)]
    pub struct FakeGeometry {
        pub vertex_count: u32,
        pub vertex_bytes: u64,
    }

    impl FakeGeometry {
        pub fn of(kind: MeshKind, vertex_count: u32) -> Self {
            Self {
                vertex_count,
                vertex_bytes: u64::from(vertex_count) * kind.vertex_stride(),
            }
        }
    }

    impl Geometry for FakeGeometry {
        fn vertex_count(&self) -> u32 {
            self.vertex_count
        }

        fn vertex_bytes(&self) -> u64 {
            self.vertex_bytes
        }
    }
}
