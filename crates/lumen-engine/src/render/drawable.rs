/// A texture a frame is rendered into and then shown.
///
/// Drawables with a target timestamp are presented from the engine's
/// presenter thread, hence `Send + 'static`.
pub trait Drawable: Send + 'static {
    fn format(&self) -> wgpu::TextureFormat;

    /// Size in physical pixels.
    fn size(&self) -> (u32, u32);

    fn view(&self) -> &wgpu::TextureView;

    /// Shows the frame as soon as possible.
    fn present(self)
    where
        Self: Sized;
}

/// A swapchain texture acquired from a surface.
pub struct SurfaceFrame {
    texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    format: wgpu::TextureFormat,
}

impl SurfaceFrame {
    pub fn new(texture: wgpu::SurfaceTexture, format: wgpu::TextureFormat) -> Self {
        let view = texture.texture.create_view(&wgpu::TextureViewDescriptor {
            format: Some(format),
            ..Default::default()
        });
        Self { texture, view, format }
    }
}

impl Drawable for SurfaceFrame {
    fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    fn size(&self) -> (u32, u32) {
        (self.texture.texture.width(), self.texture.texture.height())
    }

    fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    fn present(self) {
        drop(self.view);
        self.texture.present();
    }
}

/// Offscreen render target. Presenting it is a no-op; the texture keeps the
/// last frame and can be copied out.
#[derive(Debug, Clone)]
pub struct OffscreenTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl OffscreenTarget {
    pub fn new(device: &wgpu::Device, width: u32, height: u32, format: wgpu::TextureFormat) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("lumen offscreen target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }
}

impl Drawable for OffscreenTarget {
    fn format(&self) -> wgpu::TextureFormat {
        self.texture.format()
    }

    fn size(&self) -> (u32, u32) {
        (self.texture.width(), self.texture.height())
    }

    fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    fn present(self) {}
}
