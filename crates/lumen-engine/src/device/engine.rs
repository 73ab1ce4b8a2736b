use std::num::NonZeroU64;
use std::sync::Arc;
use std::time::Instant;

use bytemuck::Pod;
use wgpu::util::DeviceExt;

use crate::render::pipeline::{MeshPipelineCompiler, MeshPipelines, PipelineCache, PipelineKey, PipelineState};
use crate::render::{depth_stencil_state, PipelineError};
use crate::scene::Mesh;
use crate::uniform::SceneUniform;

use super::poll::CompletionPoller;
use super::present::FramePresenter;
use super::upload::{self, TEXTURE_BYTES_PER_TEXEL};
use super::{EngineConfig, EngineError, UploadError};

const MESH_SHADER: &str = include_str!("../render/shaders/mesh.wgsl");
const WEIGHTED_SHADER: &str = include_str!("../render/shaders/weighted.wgsl");

/// Bind group layouts shared by every renderer.
#[derive(Debug)]
pub(crate) struct EngineLayouts {
    /// group(0): scene uniform + sampler.
    pub(crate) scene: wgpu::BindGroupLayout,
    /// group(1): per-instance uniform with a dynamic offset.
    pub(crate) instance: wgpu::BindGroupLayout,
    /// group(2): mesh texture.
    pub(crate) texture: wgpu::BindGroupLayout,
}

/// Process-wide GPU state: device, queue, shared layouts, samplers, shaders
/// and the pipeline cache.
///
/// Created once and shared by every renderer through `EngineContext`.
pub struct RenderEngine {
    instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,

    anisotropic_sampler: wgpu::Sampler,
    nearest_sampler: wgpu::Sampler,
    layouts: EngineLayouts,

    pipelines: PipelineCache<MeshPipelines>,
    poller: CompletionPoller,
    presenter: FramePresenter,
}

impl RenderEngine {
    /// Creates the engine, blocking on adapter and device requests.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        pollster::block_on(Self::new_async(config))
    }

    pub async fn new_async(config: EngineConfig) -> Result<Self, EngineError> {
        let EngineConfig {
            backends,
            power_preference,
            force_fallback_adapter,
            required_features,
            required_limits,
            memory_hints,
        } = config;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: None,
                force_fallback_adapter,
            })
            .await?;

        let info = adapter.get_info();
        log::info!("adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("lumen-engine device"),
                required_features,
                required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints,
                trace: wgpu::Trace::Off,
            })
            .await?;

        let mesh_shader = create_shader(&device, "lumen mesh shader", MESH_SHADER).await?;
        let weighted_shader = create_shader(&device, "lumen weighted shader", WEIGHTED_SHADER).await?;

        let layouts = create_layouts(&device);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lumen mesh pipeline layout"),
            bind_group_layouts: &[&layouts.scene, &layouts.instance, &layouts.texture],
            immediate_size: 0,
        });

        let anisotropic_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("lumen anisotropic sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Linear,
            anisotropy_clamp: 16,
            ..Default::default()
        });
        let nearest_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("lumen nearest sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let compiler = MeshPipelineCompiler {
            device: device.clone(),
            adapter: adapter.clone(),
            mesh_shader,
            weighted_shader,
            layout: pipeline_layout,
        };
        let pipelines = PipelineCache::new(move |key| compiler.compile(key));

        let poller = CompletionPoller::spawn(device.clone()).map_err(EngineError::Poller)?;
        let presenter = FramePresenter::spawn().map_err(EngineError::Presenter)?;

        log::debug!("render engine ready");

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            anisotropic_sampler,
            nearest_sampler,
            layouts,
            pipelines,
            poller,
            presenter,
        })
    }

    // ── accessors ───────────────────────────────────────────────────────

    pub fn instance(&self) -> &wgpu::Instance {
        &self.instance
    }

    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn limits(&self) -> wgpu::Limits {
        self.device.limits()
    }

    pub fn anisotropic_sampler(&self) -> &wgpu::Sampler {
        &self.anisotropic_sampler
    }

    pub fn nearest_sampler(&self) -> &wgpu::Sampler {
        &self.nearest_sampler
    }

    pub(crate) fn layouts(&self) -> &EngineLayouts {
        &self.layouts
    }

    /// Depth/stencil state used by every mesh pipeline.
    pub fn depth_stencil_state(&self, format: wgpu::TextureFormat) -> wgpu::DepthStencilState {
        depth_stencil_state(format)
    }

    /// Alignment every dynamic uniform offset must honor.
    pub fn uniform_offset_alignment(&self) -> usize {
        self.device.limits().min_uniform_buffer_offset_alignment as usize
    }

    // ── pipelines ───────────────────────────────────────────────────────

    /// Pipelines for a format pair. Starts compiling them on first use.
    pub fn pipelines(&self, color: wgpu::TextureFormat, depth_stencil: wgpu::TextureFormat) -> PipelineState<MeshPipelines> {
        self.pipelines.lookup(PipelineKey::new(color, depth_stencil))
    }

    /// Blocks until the pipelines for a format pair are ready or failed.
    pub fn wait_for_pipelines(
        &self,
        color: wgpu::TextureFormat,
        depth_stencil: wgpu::TextureFormat,
    ) -> PipelineState<MeshPipelines> {
        let key = PipelineKey::new(color, depth_stencil);
        self.pipelines.lookup(key);
        self.pipelines.wait(key).unwrap_or_else(|| {
            PipelineState::Failed(Arc::new(PipelineError::Validation(
                "pipeline entry vanished while waiting".to_string(),
            )))
        })
    }

    /// Forgets a failed format pair so the next lookup compiles again.
    pub fn retry_pipelines(&self, key: PipelineKey) -> bool {
        self.pipelines.retry(key)
    }

    /// Number of pipeline compilations started so far.
    pub fn pipeline_compilations(&self) -> usize {
        self.pipelines.compilations()
    }

    /// Wakes the completion poller after a submission.
    pub fn request_poll(&self) {
        self.poller.request();
    }

    /// Runs `present` on the presenter thread once `wake_at` has passed.
    /// Returns immediately.
    pub fn schedule_present(&self, wake_at: Instant, present: impl FnOnce() + Send + 'static) {
        self.presenter.schedule(wake_at, present);
    }

    // ── uploads ─────────────────────────────────────────────────────────

    /// Uploads tightly packed BGRA8 texels into a shader-readable texture.
    pub fn create_texture(&self, bytes: &[u8], width: u32, height: u32) -> Result<wgpu::Texture, UploadError> {
        let max = self.device.limits().max_texture_dimension_2d;
        upload::validate_texture(bytes.len(), width, height, max)?;

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("lumen mesh texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Bgra8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytes,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(TEXTURE_BYTES_PER_TEXEL * width),
                rows_per_image: Some(height),
            },
            size,
        );

        Ok(texture)
    }

    /// Uploads raw bytes into a vertex buffer.
    pub fn create_buffer(&self, bytes: &[u8]) -> Result<wgpu::Buffer, UploadError> {
        upload::validate_buffer(bytes.len(), self.device.limits().max_buffer_size)?;

        Ok(self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("lumen vertex buffer"),
            contents: bytes,
            usage: wgpu::BufferUsages::VERTEX,
        }))
    }

    /// Uploads typed vertices into a vertex buffer.
    pub fn create_vertex_buffer<V: Pod>(&self, vertices: &[V]) -> Result<wgpu::Buffer, UploadError> {
        self.create_buffer(bytemuck::cast_slice(vertices))
    }

    /// Wraps geometry and its texture into a drawable `Mesh`.
    pub fn create_mesh(&self, vertex_buffer: wgpu::Buffer, vertex_count: u32, texture: wgpu::Texture) -> Mesh {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let texture_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lumen mesh texture bind group"),
            layout: &self.layouts.texture,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            }],
        });

        Mesh {
            vertex_buffer,
            vertex_count,
            texture,
            texture_bind_group,
        }
    }
}

async fn create_shader(device: &wgpu::Device, label: &'static str, source: &str) -> Result<wgpu::ShaderModule, EngineError> {
    let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    let scoped = scope.pop().await;

    let info = module.get_compilation_info().await;
    let mut errors: Vec<String> = info
        .messages
        .iter()
        .filter(|m| m.message_type == wgpu::CompilationMessageType::Error)
        .map(|m| m.message.clone())
        .collect();
    if errors.is_empty() {
        errors.extend(scoped.map(|err| err.to_string()));
    }

    for m in &info.messages {
        if m.message_type == wgpu::CompilationMessageType::Warning {
            log::warn!("{label}: {}", m.message);
        }
    }

    if errors.is_empty() {
        Ok(module)
    } else {
        Err(EngineError::ShaderModule {
            label,
            message: errors.join("\n"),
        })
    }
}

fn create_layouts(device: &wgpu::Device) -> EngineLayouts {
    let scene = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("lumen scene layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(std::mem::size_of::<SceneUniform>() as u64),
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    });

    let instance = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("lumen instance layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: None,
            },
            count: None,
        }],
    });

    let texture = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("lumen texture layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        }],
    });

    EngineLayouts { scene, instance, texture }
}
