use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::device::{EngineContext, EngineLayouts, RenderEngine};
use crate::scene::{Canvas, MeshKind, SharedCanvas};
use crate::uniform::{FrameCounter, GpuUniformRing};

use super::depth::DepthTarget;
use super::pipeline::{MeshPipelines, PipelineKey, PipelineState};
use super::plan::{self, FramePlan, FrameRings, PassCommand};
use super::{Drawable, FrameGate, RenderError};

/// Per-renderer settings.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Frames that may be queued on the GPU at once; also the number of
    /// uniform slots per ring.
    pub frames_in_flight: usize,

    /// Growth step of the per-instance rings.
    pub mesh_step: usize,

    /// Growth step of the scene ring.
    pub scene_step: usize,

    pub clear_color: wgpu::Color,
    pub clear_depth: f32,
    pub clear_stencil: u32,

    /// Format of the depth/stencil attachment. Formats other than the
    /// default may need device features.
    pub depth_format: wgpu::TextureFormat,

    /// How long before a target timestamp the drawable is handed over.
    pub present_lead: Duration,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: 3,
            mesh_step: 512,
            scene_step: 4,
            clear_color: wgpu::Color::TRANSPARENT,
            clear_depth: 1.0,
            clear_stencil: 0,
            depth_format: wgpu::TextureFormat::Depth24PlusStencil8,
            present_lead: Duration::from_millis(2),
        }
    }
}

/// Timing of one render invocation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameTiming {
    pub timestamp: Instant,
    pub presentation_timestamp: Option<Instant>,
    /// When set (and `force_wait` is not), the drawable is presented at this
    /// time rather than immediately.
    pub target_timestamp: Option<Instant>,
    /// Return only once the GPU has accepted the frame.
    pub force_wait: bool,
}

impl FrameTiming {
    /// Timing for a manual redraw: present now, wait for scheduling.
    pub fn immediate(now: Instant) -> Self {
        Self {
            timestamp: now,
            presentation_timestamp: None,
            target_timestamp: None,
            force_wait: true,
        }
    }
}

/// Counters describing a submitted frame.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FrameStats {
    /// Total frames rendered by this renderer, including this one.
    pub frame_index: u64,
    /// Uniform slot written this frame.
    pub slot: usize,
    pub pipeline_binds: usize,
    pub draws: usize,
    pub clears: usize,
    pub skipped_instances: usize,
    /// `false` while the pipelines for this format pair are pending or failed;
    /// such frames only clear.
    pub pipelines_ready: bool,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SkipReason {
    NoCanvas,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AbortReason {
    /// The drawable has a zero dimension.
    EmptyDrawable,
}

/// What happened to one render invocation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameOutcome {
    Submitted(FrameStats),
    /// Nothing was acquired, encoded or presented.
    Skipped(SkipReason),
    /// The frame was started and abandoned; its permit was released.
    Aborted(AbortReason),
}

/// GPU mirrors of the four uniform rings.
struct GpuRings {
    opaque: GpuUniformRing,
    shaded: GpuUniformRing,
    weighted: GpuUniformRing,
    scene: GpuUniformRing,
}

impl GpuRings {
    fn new() -> Self {
        Self {
            opaque: GpuUniformRing::new("lumen opaque uniforms"),
            shaded: GpuUniformRing::new("lumen shaded uniforms"),
            weighted: GpuUniformRing::new("lumen weighted uniforms"),
            scene: GpuUniformRing::new("lumen scene uniforms"),
        }
    }

    fn sync(&mut self, engine: &RenderEngine, rings: &FrameRings) {
        let device = engine.device();
        let queue = engine.queue();
        let layouts = engine.layouts();

        self.opaque.sync(device, queue, &rings.opaque, |d, b| instance_group(d, layouts, b));
        self.shaded.sync(device, queue, &rings.shaded, |d, b| instance_group(d, layouts, b));
        self.weighted.sync(device, queue, &rings.weighted, |d, b| instance_group(d, layouts, b));
        self.scene.sync(device, queue, &rings.scene, |d, b| {
            d.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("lumen scene bind group"),
                layout: &layouts.scene,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::Buffer(b),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(engine.nearest_sampler()),
                    },
                ],
            })
        });
    }

    fn instance_group(&self, kind: MeshKind) -> Option<&wgpu::BindGroup> {
        match kind {
            MeshKind::Opaque => self.opaque.current_bind_group(),
            MeshKind::Shaded => self.shaded.current_bind_group(),
            MeshKind::Weighted => self.weighted.current_bind_group(),
        }
    }
}

fn instance_group(device: &wgpu::Device, layouts: &EngineLayouts, binding: wgpu::BufferBinding<'_>) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("lumen instance bind group"),
        layout: &layouts.instance,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(binding),
        }],
    })
}

/// Renders a `Canvas` into drawables, keeping at most `frames_in_flight`
/// frames queued on the GPU.
///
/// One renderer per view. All calls come from the thread driving the view;
/// only permit releases happen elsewhere.
pub struct CanvasRenderer {
    engine: Arc<RenderEngine>,
    config: RendererConfig,
    canvas: Option<SharedCanvas>,

    gate: FrameGate,
    rings: FrameRings,
    gpu_rings: GpuRings,
    depth: DepthTarget,

    reported_skips: usize,
    reported_failure: Option<PipelineKey>,
}

impl CanvasRenderer {
    pub fn new(context: &EngineContext, config: RendererConfig) -> Result<Self, RenderError> {
        let engine = context.engine()?.clone();
        let frames = config.frames_in_flight.max(1);
        let alignment = engine.uniform_offset_alignment();

        let rings = FrameRings::new(FrameCounter::new(frames), config.mesh_step, config.scene_step, alignment);

        log::debug!(
            "canvas renderer: {} frames in flight, depth {:?}",
            frames,
            config.depth_format
        );

        Ok(Self {
            gate: FrameGate::new(frames),
            rings,
            gpu_rings: GpuRings::new(),
            depth: DepthTarget::new(config.depth_format),
            engine,
            config,
            canvas: None,
            reported_skips: 0,
            reported_failure: None,
        })
    }

    pub fn set_canvas(&mut self, canvas: Option<SharedCanvas>) {
        self.canvas = canvas;
    }

    pub fn canvas(&self) -> Option<&SharedCanvas> {
        self.canvas.as_ref()
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn engine(&self) -> &Arc<RenderEngine> {
        &self.engine
    }

    /// Frames submitted whose GPU work has not completed yet.
    pub fn frames_in_flight(&self) -> usize {
        self.gate.capacity() - self.gate.available()
    }

    /// Shared frame gate; cloning it lets callers observe the permit count.
    pub fn gate(&self) -> &FrameGate {
        &self.gate
    }

    /// Renders one frame of the current canvas into `drawable`.
    ///
    /// Blocks while `frames_in_flight` frames are still queued on the GPU.
    pub fn render<D: Drawable>(&mut self, drawable: D, timing: FrameTiming) -> FrameOutcome {
        let (width, height) = drawable.size();
        let key = PipelineKey::new(drawable.format(), self.depth.format());

        // Looking up first starts compilation even when nothing is drawn.
        let pipelines = self.engine.pipelines(key.color, key.depth_stencil);

        let Some(shared) = self.canvas.clone() else {
            log::trace!("frame skipped: no canvas");
            return FrameOutcome::Skipped(SkipReason::NoCanvas);
        };

        let permit = self.gate.acquire();
        let slot = self.rings.advance();

        let canvas = shared.read();
        let ready = self.pipelines_ready(key, &pipelines);
        let plan = plan::record(&*canvas, &mut self.rings, ready.is_some());
        self.report_skips(&plan);

        if width == 0 || height == 0 {
            log::debug!("frame aborted: drawable is {}x{}", width, height);
            drop(permit);
            return FrameOutcome::Aborted(AbortReason::EmptyDrawable);
        }

        self.gpu_rings.sync(&self.engine, &self.rings);
        let depth_view = self.depth.ensure(self.engine.device(), width, height);

        let mut encoder = self
            .engine
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lumen frame encoder"),
            });

        encode_pass(
            &mut encoder,
            &plan,
            &*canvas,
            ready.as_deref(),
            &self.gpu_rings,
            drawable.view(),
            depth_view,
            &self.config,
        );
        drop(canvas);

        self.engine.queue().submit(std::iter::once(encoder.finish()));
        self.engine.queue().on_submitted_work_done(move || drop(permit));
        self.engine.request_poll();

        match timing.target_timestamp {
            Some(target) if !timing.force_wait => {
                let wake_at = target.checked_sub(self.config.present_lead).unwrap_or(target);
                self.engine.schedule_present(wake_at, move || drawable.present());
            }
            _ => drawable.present(),
        }

        if timing.force_wait {
            // `submit` returning means the queue accepted the work; this only
            // runs callbacks that are already due.
            if let Err(err) = self.engine.device().poll(wgpu::PollType::Poll) {
                log::warn!("frame poll after submit: {err}");
            }
        }

        let stats = FrameStats {
            frame_index: self.rings.counter.ticks() as u64,
            slot,
            pipeline_binds: plan.pipeline_binds(),
            draws: plan.draws(),
            clears: plan.clears(),
            skipped_instances: plan.skipped_instances,
            pipelines_ready: ready.is_some(),
        };
        log::trace!("frame submitted: {:?}", stats);

        FrameOutcome::Submitted(stats)
    }

    fn pipelines_ready(&mut self, key: PipelineKey, state: &PipelineState<MeshPipelines>) -> Option<Arc<MeshPipelines>> {
        match state {
            PipelineState::Ready(p) => {
                self.reported_failure = None;
                Some(p.clone())
            }
            PipelineState::Pending => None,
            PipelineState::Failed(err) => {
                if self.reported_failure != Some(key) {
                    log::warn!(
                        "pipelines for {:?} / {:?} unavailable, rendering clear-only: {}",
                        key.color,
                        key.depth_stencil,
                        err
                    );
                    self.reported_failure = Some(key);
                }
                None
            }
        }
    }

    fn report_skips(&mut self, plan: &FramePlan) {
        if plan.skipped_instances != self.reported_skips {
            if plan.skipped_instances > 0 {
                log::warn!(
                    "{} mesh instances skipped: vertex data does not match their category",
                    plan.skipped_instances
                );
            }
            self.reported_skips = plan.skipped_instances;
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn encode_pass(
    encoder: &mut wgpu::CommandEncoder,
    plan: &FramePlan,
    canvas: &Canvas,
    pipelines: Option<&MeshPipelines>,
    rings: &GpuRings,
    color_view: &wgpu::TextureView,
    depth_view: &wgpu::TextureView,
    config: &RendererConfig,
) {
    let stencil_ops = config.depth_format.has_stencil_aspect().then_some(wgpu::Operations {
        load: wgpu::LoadOp::Clear(config.clear_stencil),
        store: wgpu::StoreOp::Discard,
    });

    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("lumen canvas pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: color_view,
            depth_slice: None,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(config.clear_color),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: depth_view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(config.clear_depth),
                store: wgpu::StoreOp::Discard,
            }),
            stencil_ops,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });

    for command in &plan.commands {
        match *command {
            // Clearing happens through the attachment load ops.
            PassCommand::Clear => {}
            PassCommand::BindScene => {
                if let Some(group) = rings.scene.current_bind_group() {
                    pass.set_bind_group(0, group, &[]);
                }
            }
            PassCommand::SetPipeline(kind) => {
                if let Some(pipelines) = pipelines {
                    pass.set_pipeline(pipelines.get(kind));
                }
            }
            PassCommand::Draw {
                kind,
                instance,
                uniform_offset,
                vertex_count,
            } => {
                let (Some(group), Some(instance)) = (rings.instance_group(kind), canvas.instances(kind).get(instance))
                else {
                    continue;
                };
                let mesh = &instance.mesh;
                pass.set_bind_group(1, group, &[uniform_offset]);
                pass.set_bind_group(2, mesh.texture_bind_group(), &[]);
                pass.set_vertex_buffer(0, mesh.vertex_buffer().slice(..));
                pass.draw(0..vertex_count, 0..1);
            }
        }
    }
}
