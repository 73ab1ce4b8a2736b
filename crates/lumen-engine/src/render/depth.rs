/// Depth/stencil state baked into every mesh pipeline: write depth, keep
/// fragments nearer than what is stored.
pub fn depth_stencil_state(format: wgpu::TextureFormat) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::Less,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

/// Per-renderer depth/stencil attachment.
///
/// The texture is only ever a render attachment and its contents are
/// discarded after the pass, so drivers may keep it in tile memory.
#[derive(Debug)]
pub(crate) struct DepthTarget {
    format: wgpu::TextureFormat,
    current: Option<Attachment>,
}

#[derive(Debug)]
struct Attachment {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl DepthTarget {
    pub(crate) fn new(format: wgpu::TextureFormat) -> Self {
        Self { format, current: None }
    }

    pub(crate) fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub(crate) fn size(&self) -> Option<(u32, u32)> {
        self.current.as_ref().map(|a| (a.width, a.height))
    }

    pub(crate) fn needs_resize(&self, width: u32, height: u32) -> bool {
        self.size() != Some((width, height))
    }

    /// Returns a view matching `width`x`height`, recreating the texture if
    /// the drawable size changed.
    pub(crate) fn ensure(&mut self, device: &wgpu::Device, width: u32, height: u32) -> &wgpu::TextureView {
        if self.needs_resize(width, height) {
            self.current = None;
        }
        let format = self.format;
        let attachment = self
            .current
            .get_or_insert_with(|| Attachment::create(device, format, width, height));
        &attachment.view
    }
}

impl Attachment {
    fn create(device: &wgpu::Device, format: wgpu::TextureFormat, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("lumen depth-stencil"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        log::debug!("depth target: {}x{} {:?}", width, height, format);

        Self {
            _texture: texture,
            view,
            width,
            height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_if_nearer() {
        let state = depth_stencil_state(wgpu::TextureFormat::Depth24PlusStencil8);
        assert!(state.depth_write_enabled);
        assert_eq!(state.depth_compare, wgpu::CompareFunction::Less);
        assert_eq!(state.format, wgpu::TextureFormat::Depth24PlusStencil8);
    }

    #[test]
    fn empty_target_needs_resize() {
        let target = DepthTarget::new(wgpu::TextureFormat::Depth32Float);
        assert_eq!(target.size(), None);
        assert!(target.needs_resize(1, 1));
    }
}
