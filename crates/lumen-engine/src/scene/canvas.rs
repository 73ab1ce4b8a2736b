use std::sync::Arc;

use glam::{Mat4, Vec3};
use parking_lot::RwLock;

use super::{Camera, Geometry, Mesh, MeshKind};

/// Canvas shared between the application and a renderer.
///
/// The renderer holds the read lock while it records a frame, so writers
/// never observe a half-recorded frame and vice versa.
pub type SharedCanvas = Arc<RwLock<Canvas>>;

/// One placement of a mesh.
#[derive(Debug)]
pub struct MeshInstance<G = Mesh> {
    pub mesh: Arc<G>,
    pub transform: Mat4,
    /// Second transform, read only by weighted meshes.
    pub blend_transform: Mat4,
}

impl<G> Clone for MeshInstance<G> {
    fn clone(&self) -> Self {
        Self {
            mesh: self.mesh.clone(),
            transform: self.transform,
            blend_transform: self.blend_transform,
        }
    }
}

impl<G> MeshInstance<G> {
    pub fn new(mesh: Arc<G>) -> Self {
        Self {
            mesh,
            transform: Mat4::IDENTITY,
            blend_transform: Mat4::IDENTITY,
        }
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_blend_transform(mut self, blend_transform: Mat4) -> Self {
        self.blend_transform = blend_transform;
        self
    }
}

/// Scene drawn by a `CanvasRenderer`: three ordered instance lists and a camera.
///
/// Lists are drawn opaque, then shaded, then weighted, each in insertion order.
#[derive(Debug)]
pub struct Canvas<G = Mesh> {
    pub opaque: Vec<MeshInstance<G>>,
    pub shaded: Vec<MeshInstance<G>>,
    pub weighted: Vec<MeshInstance<G>>,
    pub camera: Camera,
    /// Ambient light color multiplied into every fragment.
    pub ambient: Vec3,
}

impl<G> Default for Canvas<G> {
    fn default() -> Self {
        Self {
            opaque: Vec::new(),
            shaded: Vec::new(),
            weighted: Vec::new(),
            camera: Camera::default(),
            ambient: Vec3::ONE,
        }
    }
}

impl<G: Geometry> Canvas<G> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instances(&self, kind: MeshKind) -> &[MeshInstance<G>] {
        match kind {
            MeshKind::Opaque => &self.opaque,
            MeshKind::Shaded => &self.shaded,
            MeshKind::Weighted => &self.weighted,
        }
    }

    pub fn instances_mut(&mut self, kind: MeshKind) -> &mut Vec<MeshInstance<G>> {
        match kind {
            MeshKind::Opaque => &mut self.opaque,
            MeshKind::Shaded => &mut self.shaded,
            MeshKind::Weighted => &mut self.weighted,
        }
    }

    pub fn push(&mut self, kind: MeshKind, instance: MeshInstance<G>) {
        self.instances_mut(kind).push(instance);
    }

    /// Total instances across all categories.
    pub fn len(&self) -> usize {
        self.opaque.len() + self.shaded.len() + self.weighted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every instance; the camera is kept.
    pub fn clear(&mut self) {
        self.opaque.clear();
        self.shaded.clear();
        self.weighted.clear();
    }
}

impl Canvas<Mesh> {
    pub fn into_shared(self) -> SharedCanvas {
        Arc::new(RwLock::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::test_support::FakeGeometry;

    fn geometry() -> Arc<FakeGeometry> {
        Arc::new(FakeGeometry::of(MeshKind::Opaque, 3))
    }

    #[test]
    fn instances_default_to_identity() {
        let i = MeshInstance::new(geometry());
        assert_eq!(i.transform, Mat4::IDENTITY);
        assert_eq!(i.blend_transform, Mat4::IDENTITY);
    }

    #[test]
    fn push_keeps_category_order() {
        let mut c: Canvas<FakeGeometry> = Canvas::new();
        let g = geometry();
        for x in 0..3 {
            let t = Mat4::from_translation(Vec3::X * x as f32);
            c.push(MeshKind::Shaded, MeshInstance::new(g.clone()).with_transform(t));
        }
        c.push(MeshKind::Opaque, MeshInstance::new(g.clone()));

        assert_eq!(c.len(), 4);
        assert_eq!(c.instances(MeshKind::Opaque).len(), 1);
        let xs: Vec<f32> = c.shaded.iter().map(|i| i.transform.w_axis.x).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn meshes_are_shared_between_instances() {
        let mut c: Canvas<FakeGeometry> = Canvas::new();
        let g = geometry();
        c.push(MeshKind::Opaque, MeshInstance::new(g.clone()));
        c.push(MeshKind::Weighted, MeshInstance::new(g.clone()));
        assert_eq!(Arc::strong_count(&g), 3);

        c.clear();
        assert!(c.is_empty());
        assert_eq!(Arc::strong_count(&g), 1);
    }

    #[test]
    fn ambient_defaults_to_white() {
        let c: Canvas<FakeGeometry> = Canvas::default();
        assert_eq!(c.ambient, Vec3::ONE);
    }
}
