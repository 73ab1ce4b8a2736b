use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};

use crate::device::surface::{
    apply_resize, choose_alpha_mode, choose_present_mode, choose_surface_format, map_surface_error,
};
use crate::device::{EngineContext, RenderEngine, SurfaceErrorAction};
use crate::input::InputManager;
use crate::render::{CanvasRenderer, FrameOutcome, FrameTiming, RendererConfig, SurfaceFrame};
use crate::scene::SharedCanvas;
use crate::time::{ClockCapabilities, DisplayUpdate, FrameClock, FrameRequest, SurfaceId};

/// Surface and pacing parameters of a view.
#[derive(Debug, Clone)]
pub struct ViewConfig {
    /// Prefer an sRGB surface format when available.
    pub prefer_srgb: bool,

    /// Present mode (swap behavior). Falls back to FIFO when unsupported.
    pub present_mode: wgpu::PresentMode,

    /// Optional alpha mode preference for the surface.
    ///
    /// If provided but unsupported on the current surface, a supported mode is selected.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Desired maximum frame latency for the surface.
    ///
    /// This value is a hint; support depends on platform/backend.
    pub desired_maximum_frame_latency: u32,

    /// Which display signal drives the view.
    pub clock: ClockCapabilities,

    pub renderer: RendererConfig,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            desired_maximum_frame_latency: 2,
            clock: ClockCapabilities::default(),
            renderer: RendererConfig::default(),
        }
    }
}

/// Passed to the frame listener right before a frame is rendered.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameInfo {
    /// Surface size in physical pixels.
    pub size: (u32, u32),
    pub timestamp: Instant,
    pub presentation_timestamp: Option<Instant>,
    pub frame_index: u64,
    pub dt: f32,
}

pub type FrameListener = Box<dyn FnMut(&FrameInfo) + Send>;

/// Result of feeding a display signal to a view.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ViewFrame {
    Rendered(FrameOutcome),
    /// The signal did not lead to a frame (paused, detached, zero size).
    Idle,
    /// No drawable could be acquired.
    SurfaceError(SurfaceErrorAction),
}

/// A surface bound to a `CanvasRenderer` and paced by a `FrameClock`.
///
/// Platform glue owns one view per window or layer and forwards display
/// signals, resizes and surface changes to it.
pub struct CanvasView {
    engine: Arc<RenderEngine>,
    surface: wgpu::Surface<'static>,
    surface_id: SurfaceId,
    config: wgpu::SurfaceConfiguration,
    size: (u32, u32),
    view_config: ViewConfig,

    renderer: CanvasRenderer,
    clock: FrameClock,
    input: Arc<InputManager>,
    listener: Option<FrameListener>,
}

impl CanvasView {
    /// Creates the surface for `target`, configures it and attaches a clock.
    ///
    /// A zero `size` is accepted; configuration is deferred until `resize`.
    pub fn new(
        context: &EngineContext,
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        size: (u32, u32),
        view_config: ViewConfig,
    ) -> Result<Self> {
        let engine = context.engine().context("cannot create a view")?.clone();
        let surface = engine
            .instance()
            .create_surface(target)
            .context("failed to create wgpu surface")?;

        let config = surface_config(&engine, &surface, size, &view_config)?;
        let renderer = CanvasRenderer::new(context, view_config.renderer.clone())?;

        let surface_id = SurfaceId::next();
        let mut clock = FrameClock::select(view_config.clock);
        clock.attach(surface_id);

        // Warm the pipeline cache for the surface format.
        engine.pipelines(config.format, view_config.renderer.depth_format);

        let mut view = Self {
            engine,
            surface,
            surface_id,
            config,
            size: (0, 0),
            view_config,
            renderer,
            clock,
            input: Arc::new(InputManager::new()),
            listener: None,
        };
        view.configure(size);

        log::debug!(
            "canvas view: {:?} {}x{} ({})",
            view.config.format,
            size.0,
            size.1,
            if view.clock.is_fixed_rate() { "fixed rate" } else { "variable rate" }
        );
        Ok(view)
    }

    // ── accessors ───────────────────────────────────────────────────────

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Current drawable size in physical pixels.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn surface_id(&self) -> SurfaceId {
        self.surface_id
    }

    pub fn renderer(&self) -> &CanvasRenderer {
        &self.renderer
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Queue platform glue feeds input into.
    pub fn input(&self) -> &Arc<InputManager> {
        &self.input
    }

    pub fn set_input_manager(&mut self, input: Arc<InputManager>) {
        self.input = input;
    }

    pub fn is_paused(&self) -> bool {
        self.clock.is_paused()
    }

    // ── display signals ─────────────────────────────────────────────────

    /// Fixed-rate display tick.
    pub fn on_display_tick(&mut self, now: Instant) -> ViewFrame {
        if !self.clock.is_fixed_rate() || !self.accepts_frames() {
            return ViewFrame::Idle;
        }

        let mut surface_error = None;
        let (surface, device, config, size) = (&self.surface, self.engine.device(), &self.config, self.size);
        let request = self.clock.on_tick(self.surface_id, now, || {
            acquire(surface, device, config, size)
                .map_err(|action| surface_error = Some(action))
                .ok()
        });

        match (request, surface_error) {
            (Some(request), _) => self.render_request(request),
            (None, Some(action)) => ViewFrame::SurfaceError(action),
            (None, None) => ViewFrame::Idle,
        }
    }

    /// Variable-rate display update carrying target timestamps.
    pub fn on_display_update(&mut self, target_timestamp: Instant, target_presentation_timestamp: Instant) -> ViewFrame {
        if self.clock.is_fixed_rate() || !self.accepts_frames() {
            return ViewFrame::Idle;
        }

        let drawable = match acquire(&self.surface, self.engine.device(), &self.config, self.size) {
            Ok(drawable) => drawable,
            Err(action) => return ViewFrame::SurfaceError(action),
        };

        let update = DisplayUpdate {
            drawable,
            target_timestamp,
            target_presentation_timestamp,
        };
        match self.clock.on_update(self.surface_id, update) {
            Some(request) => self.render_request(request),
            None => ViewFrame::Idle,
        }
    }

    /// Renders immediately, bypassing the clock. Used while paused or
    /// resizing; waits until the frame is scheduled.
    pub fn render_now(&mut self) -> ViewFrame {
        if self.size.0 == 0 || self.size.1 == 0 {
            return ViewFrame::Idle;
        }
        let drawable = match acquire(&self.surface, self.engine.device(), &self.config, self.size) {
            Ok(drawable) => drawable,
            Err(action) => return ViewFrame::SurfaceError(action),
        };

        let timing = FrameTiming::immediate(Instant::now());
        let info = FrameInfo {
            size: self.size,
            timestamp: timing.timestamp,
            presentation_timestamp: None,
            frame_index: self.clock.frame_index(),
            dt: 0.0,
        };
        self.notify(&info);
        ViewFrame::Rendered(self.renderer.render(drawable, timing))
    }

    fn render_request(&mut self, request: FrameRequest<SurfaceFrame>) -> ViewFrame {
        let info = FrameInfo {
            size: self.size,
            timestamp: request.timing.timestamp,
            presentation_timestamp: request.timing.presentation_timestamp,
            frame_index: request.frame_index,
            dt: request.dt,
        };
        self.notify(&info);
        ViewFrame::Rendered(self.renderer.render(request.drawable, request.timing))
    }

    fn notify(&mut self, info: &FrameInfo) {
        if let Some(listener) = self.listener.as_mut() {
            listener(info);
        }
    }

    fn accepts_frames(&self) -> bool {
        !self.clock.is_paused()
            && self.clock.attached() == Some(self.surface_id)
            && self.size.0 > 0
            && self.size.1 > 0
    }

    // ── lifecycle ───────────────────────────────────────────────────────

    /// Applies a new drawable size. A running view redraws right away so the
    /// content follows the resize; a paused one only reconfigures.
    pub fn resize(&mut self, width: u32, height: u32) -> ViewFrame {
        if !self.configure((width, height)) {
            return ViewFrame::Idle;
        }
        if self.clock.is_paused() {
            ViewFrame::Idle
        } else {
            self.render_now()
        }
    }

    /// Rebuilds the surface for a new target (e.g. a recreated layer) and
    /// reattaches the clock to it.
    pub fn surface_changed(&mut self, target: impl Into<wgpu::SurfaceTarget<'static>>) -> Result<()> {
        let surface = self
            .engine
            .instance()
            .create_surface(target)
            .context("failed to recreate wgpu surface")?;
        let config = surface_config(&self.engine, &surface, self.size, &self.view_config)?;

        self.surface = surface;
        self.config = config;
        self.surface_id = SurfaceId::next();
        self.clock.reattach(self.surface_id);

        let size = self.size;
        self.configure(size);
        self.engine.pipelines(self.config.format, self.view_config.renderer.depth_format);
        log::debug!("canvas view: surface changed, now {}", self.surface_id.raw());
        Ok(())
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.clock.set_paused(paused);
    }

    /// Replaces the rendered canvas. A paused view redraws once so the new
    /// canvas becomes visible.
    pub fn set_canvas(&mut self, canvas: Option<SharedCanvas>) -> ViewFrame {
        self.renderer.set_canvas(canvas);
        if self.clock.is_paused() {
            self.render_now()
        } else {
            ViewFrame::Idle
        }
    }

    /// Called with the frame's size and timestamps right before each frame.
    pub fn set_frame_listener(&mut self, listener: Option<FrameListener>) {
        self.listener = listener;
    }

    /// Stops the clock delivering frames to this view.
    pub fn detach(&mut self) {
        self.clock.detach();
    }

    fn configure(&mut self, size: (u32, u32)) -> bool {
        apply_resize(&self.surface, self.engine.device(), &mut self.config, &mut self.size, size)
    }
}

fn surface_config(
    engine: &RenderEngine,
    surface: &wgpu::Surface<'_>,
    size: (u32, u32),
    view_config: &ViewConfig,
) -> Result<wgpu::SurfaceConfiguration> {
    let caps = surface.get_capabilities(engine.adapter());
    let format = choose_surface_format(&caps, view_config.prefer_srgb)
        .context("surface is not compatible with the engine's adapter")?;

    Ok(wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: size.0.max(1),
        height: size.1.max(1),
        present_mode: choose_present_mode(&caps, view_config.present_mode),
        alpha_mode: choose_alpha_mode(&caps, view_config.alpha_mode),
        view_formats: vec![],
        desired_maximum_frame_latency: view_config.desired_maximum_frame_latency,
    })
}

fn acquire(
    surface: &wgpu::Surface<'_>,
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    size: (u32, u32),
) -> std::result::Result<SurfaceFrame, SurfaceErrorAction> {
    match surface.get_current_texture() {
        Ok(texture) => Ok(SurfaceFrame::new(texture, config.format)),
        Err(err) => {
            let action = map_surface_error(surface, device, config, size, err);
            log::debug!("surface acquisition failed: {:?}", action);
            Err(action)
        }
    }
}
