//! CPU side of a frame: uniform writes and the ordered pass commands.
//!
//! Recording needs no device, so everything the renderer decides per frame
//! is covered by the tests below.

use crate::scene::{Canvas, Geometry, MeshInstance, MeshKind};
use crate::uniform::{FrameCounter, MeshUniform, SceneUniform, UniformRing, WeightedMeshUniform};

/// One step of the render pass, in encoding order.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PassCommand {
    /// Clear color, depth and stencil.
    Clear,
    /// Bind the scene record and sampler at group 0.
    BindScene,
    SetPipeline(MeshKind),
    Draw {
        kind: MeshKind,
        /// Index into the canvas list for `kind`.
        instance: usize,
        /// Dynamic offset of the instance record in its ring.
        uniform_offset: u32,
        vertex_count: u32,
    },
}

/// Commands recorded for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FramePlan {
    pub commands: Vec<PassCommand>,
    /// Instances left out because their geometry does not match the
    /// category's vertex layout.
    pub skipped_instances: usize,
}

impl FramePlan {
    pub fn pipeline_binds(&self) -> usize {
        self.count(|c| matches!(c, PassCommand::SetPipeline(_)))
    }

    pub fn draws(&self) -> usize {
        self.count(|c| matches!(c, PassCommand::Draw { .. }))
    }

    pub fn clears(&self) -> usize {
        self.count(|c| matches!(c, PassCommand::Clear))
    }

    fn count(&self, f: impl Fn(&PassCommand) -> bool) -> usize {
        self.commands.iter().filter(|c| f(c)).count()
    }
}

/// The four uniform rings of a renderer, advanced by one shared counter.
#[derive(Debug)]
pub(crate) struct FrameRings {
    pub(crate) counter: FrameCounter,
    pub(crate) opaque: UniformRing<MeshUniform>,
    pub(crate) shaded: UniformRing<MeshUniform>,
    pub(crate) weighted: UniformRing<WeightedMeshUniform>,
    pub(crate) scene: UniformRing<SceneUniform>,
}

impl FrameRings {
    pub(crate) fn new(counter: FrameCounter, mesh_step: usize, scene_step: usize, alignment: usize) -> Self {
        Self {
            opaque: UniformRing::new(counter.clone(), mesh_step, alignment),
            shaded: UniformRing::new(counter.clone(), mesh_step, alignment),
            weighted: UniformRing::new(counter.clone(), mesh_step, alignment),
            scene: UniformRing::new(counter.clone(), scene_step, alignment),
            counter,
        }
    }

    /// Advances every ring to the next slot.
    pub(crate) fn advance(&mut self) -> usize {
        let slot = self.counter.tick();
        self.opaque.begin_frame();
        self.shaded.begin_frame();
        self.weighted.begin_frame();
        self.scene.begin_frame();
        slot
    }

    /// Writes the record of `instance` and returns its byte offset.
    fn write<G>(&mut self, kind: MeshKind, index: usize, instance: &MeshInstance<G>) -> u64 {
        match kind {
            MeshKind::Opaque => {
                self.opaque.set_value(&MeshUniform::new(instance.transform), index);
                self.opaque.offset_for_item(index)
            }
            MeshKind::Shaded => {
                self.shaded.set_value(&MeshUniform::new(instance.transform), index);
                self.shaded.offset_for_item(index)
            }
            MeshKind::Weighted => {
                let record = WeightedMeshUniform::new(instance.transform, instance.blend_transform);
                self.weighted.set_value(&record, index);
                self.weighted.offset_for_item(index)
            }
        }
    }
}

/// Writes this frame's uniforms and records the pass.
///
/// Uniforms are written for every instance. Draw commands are only emitted
/// when `draw_meshes` is set (pipelines are ready); otherwise the plan just
/// clears.
pub(crate) fn record<G: Geometry>(canvas: &Canvas<G>, rings: &mut FrameRings, draw_meshes: bool) -> FramePlan {
    let scene = SceneUniform::new(canvas.camera.view_projection(), canvas.ambient);
    rings.scene.set_value(&scene, 0);

    let mut plan = FramePlan {
        commands: Vec::with_capacity(2 + canvas.len() + MeshKind::ALL.len()),
        skipped_instances: 0,
    };
    plan.commands.push(PassCommand::Clear);
    plan.commands.push(PassCommand::BindScene);

    for kind in MeshKind::ALL {
        let mut pipeline_bound = false;

        for (index, instance) in canvas.instances(kind).iter().enumerate() {
            let offset = rings.write(kind, index, instance);
            if !draw_meshes {
                continue;
            }

            if !instance.mesh.fits(kind) {
                plan.skipped_instances += 1;
                continue;
            }
            let Ok(uniform_offset) = u32::try_from(offset) else {
                plan.skipped_instances += 1;
                continue;
            };

            if !pipeline_bound {
                plan.commands.push(PassCommand::SetPipeline(kind));
                pipeline_bound = true;
            }
            plan.commands.push(PassCommand::Draw {
                kind,
                instance: index,
                uniform_offset,
                vertex_count: instance.mesh.vertex_count(),
            });
        }
    }

    plan
}
