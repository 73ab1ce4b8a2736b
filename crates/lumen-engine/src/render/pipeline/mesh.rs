use crate::render::{depth_stencil_state, PipelineError};
use crate::scene::MeshKind;

use super::PipelineKey;

/// The three mesh pipeline variants built for one format pair.
#[derive(Debug)]
pub struct MeshPipelines {
    pub opaque: wgpu::RenderPipeline,
    pub shaded: wgpu::RenderPipeline,
    pub weighted: wgpu::RenderPipeline,
}

impl MeshPipelines {
    pub fn get(&self, kind: MeshKind) -> &wgpu::RenderPipeline {
        match kind {
            MeshKind::Opaque => &self.opaque,
            MeshKind::Shaded => &self.shaded,
            MeshKind::Weighted => &self.weighted,
        }
    }
}

/// Everything needed to build `MeshPipelines` off the render thread.
#[derive(Debug, Clone)]
pub(crate) struct MeshPipelineCompiler {
    pub(crate) device: wgpu::Device,
    pub(crate) adapter: wgpu::Adapter,
    pub(crate) mesh_shader: wgpu::ShaderModule,
    pub(crate) weighted_shader: wgpu::ShaderModule,
    pub(crate) layout: wgpu::PipelineLayout,
}

impl MeshPipelineCompiler {
    /// Validates the format pair and builds all three variants.
    ///
    /// Each variant is built inside a validation error scope, so device
    /// diagnostics land in the returned error whatever uncaptured error
    /// handler the host installed.
    pub(crate) fn compile(&self, key: PipelineKey) -> Result<MeshPipelines, PipelineError> {
        self.check_color(key.color)?;
        self.check_depth(key.depth_stencil)?;

        Ok(MeshPipelines {
            opaque: self.build(MeshKind::Opaque, key)?,
            shaded: self.build(MeshKind::Shaded, key)?,
            weighted: self.build(MeshKind::Weighted, key)?,
        })
    }

    fn check_color(&self, format: wgpu::TextureFormat) -> Result<(), PipelineError> {
        if format.is_depth_stencil_format() {
            return Err(unsupported(format, "depth format used as color target"));
        }
        self.check_renderable(format)
    }

    fn check_depth(&self, format: wgpu::TextureFormat) -> Result<(), PipelineError> {
        if !format.has_depth_aspect() {
            return Err(unsupported(format, "no depth aspect"));
        }
        self.check_renderable(format)
    }

    fn check_renderable(&self, format: wgpu::TextureFormat) -> Result<(), PipelineError> {
        if !self.device.features().contains(format.required_features()) {
            return Err(unsupported(format, "required device feature not enabled"));
        }
        let features = self.adapter.get_texture_format_features(format);
        if !features
            .allowed_usages
            .contains(wgpu::TextureUsages::RENDER_ATTACHMENT)
        {
            return Err(unsupported(format, "not renderable on this adapter"));
        }
        Ok(())
    }

    fn build(&self, kind: MeshKind, key: PipelineKey) -> Result<wgpu::RenderPipeline, PipelineError> {
        let (module, vs, fs) = match kind {
            MeshKind::Opaque => (&self.mesh_shader, "vs_opaque", "fs_mesh"),
            MeshKind::Shaded => (&self.mesh_shader, "vs_shaded", "fs_mesh"),
            MeshKind::Weighted => (&self.weighted_shader, "vs_weighted", "fs_weighted"),
        };

        capture_validation(&self.device, kind.label(), || {
            self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(kind.label()),
                layout: Some(&self.layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: Some(vs),
                    buffers: &[kind.vertex_layout()],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: Some(fs),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: key.color,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: Some(wgpu::Face::Back),
                    unclipped_depth: false,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    conservative: false,
                },
                depth_stencil: Some(depth_stencil_state(key.depth_stencil)),
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            })
        })
    }
}

/// Runs `create` inside a validation error scope and turns a captured error
/// into `PipelineError::Shader`.
///
/// Error scopes are per thread; `create` must not hop threads.
pub(crate) fn capture_validation<T>(
    device: &wgpu::Device,
    variant: &'static str,
    create: impl FnOnce() -> T,
) -> Result<T, PipelineError> {
    let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    match pollster::block_on(scope.pop()) {
        None => Ok(value),
        Some(err) => Err(PipelineError::Shader {
            variant,
            message: err.to_string(),
        }),
    }
}

fn unsupported(format: wgpu::TextureFormat, reason: &str) -> PipelineError {
    PipelineError::UnsupportedFormat {
        format,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHADER: &str = "
        @vertex
        fn vs_main(@builtin(vertex_index) i: u32) -> @builtin(position) vec4<f32> {
            return vec4<f32>(f32(i), 0.0, 0.0, 1.0);
        }
        @fragment
        fn fs_main() -> @location(0) vec4<f32> {
            return vec4<f32>(1.0);
        }
    ";

    fn device() -> Option<wgpu::Device> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default())).ok()?;
        let (device, _queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default())).ok()?;
        // Anything escaping a scope must not be mistaken for a captured error.
        device.on_uncaptured_error(std::sync::Arc::new(|err: wgpu::Error| log::error!("uncaptured: {err}")));
        Some(device)
    }

    fn pipeline(device: &wgpu::Device, vertex_entry: &str) -> wgpu::RenderPipeline {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("pipeline test shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER.into()),
        });
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("pipeline test"),
            layout: None,
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some(vertex_entry),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::TextureFormat::Rgba8Unorm.into())],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    }

    #[test]
    fn valid_pipeline_passes_the_scope() {
        let Some(device) = device() else { return };
        let built = capture_validation(&device, "opaque", || pipeline(&device, "vs_main"));
        assert!(built.is_ok());
    }

    #[test]
    fn invalid_pipeline_is_reported_even_with_a_quiet_error_handler() {
        let Some(device) = device() else { return };
        let built = capture_validation(&device, "shaded", || pipeline(&device, "vs_missing"));

        match built {
            Err(PipelineError::Shader { variant, message }) => {
                assert_eq!(variant, "shaded");
                assert!(!message.is_empty());
            }
            other => panic!("expected a shader error, got {:?}", other.err()),
        }
    }
}
