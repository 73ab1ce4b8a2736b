use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::render::FrameTiming;

/// Identifies the surface a clock is attached to.
///
/// Clocks hold this handle only; the view owning the surface owns the clock.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SurfaceId(u64);

impl SurfaceId {
    /// Returns a process-unique id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// What the platform offers for driving frames.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct ClockCapabilities {
    /// The display link reports a target timestamp for each update.
    pub variable_rate: bool,
}

/// One update of a variable-rate display link.
#[derive(Debug)]
pub struct DisplayUpdate<D> {
    pub drawable: D,
    /// Time the frame's content should represent.
    pub target_timestamp: Instant,
    /// Time the frame is expected on screen.
    pub target_presentation_timestamp: Instant,
}

/// A frame to render, normalized across clock variants.
#[derive(Debug)]
pub struct FrameRequest<D> {
    pub drawable: D,
    pub timing: FrameTiming,
    /// Monotonic frame counter of the clock.
    pub frame_index: u64,
    /// Time since the previous frame of this clock, in seconds (clamped).
    pub dt: f32,
}

/// State shared by both clock variants.
#[derive(Debug, Clone)]
struct ClockState {
    attached: Option<SurfaceId>,
    paused: bool,
    frame_index: u64,
    last: Option<Instant>,
    dt_min: Duration,
    dt_max: Duration,
}

impl ClockState {
    fn new() -> Self {
        Self {
            attached: None,
            paused: false,
            frame_index: 0,
            last: None,
            dt_min: Duration::from_micros(100), // 0.0001s
            dt_max: Duration::from_millis(250), // 0.25s
        }
    }

    fn accepts(&self, surface: SurfaceId) -> bool {
        !self.paused && self.attached == Some(surface)
    }

    /// Advances the counter and returns (frame_index, dt) for a frame at `at`.
    fn advance(&mut self, at: Instant) -> (u64, f32) {
        let mut dt = self
            .last
            .map(|last| at.saturating_duration_since(last))
            .unwrap_or(self.dt_min);

        // Clamp delta time to keep downstream systems stable.
        if dt < self.dt_min {
            dt = self.dt_min;
        } else if dt > self.dt_max {
            dt = self.dt_max;
        }

        self.last = Some(at);
        let index = self.frame_index;
        self.frame_index = self.frame_index.wrapping_add(1);
        (index, dt.as_secs_f32())
    }
}

/// Clock driven by a fixed-rate display tick.
///
/// The tick carries no drawable; the clock pulls one itself and asks for a
/// forced wait, since there is no target time to pace against.
#[derive(Debug, Clone)]
pub struct FixedRateClock {
    state: ClockState,
}

impl FixedRateClock {
    pub fn new() -> Self {
        Self { state: ClockState::new() }
    }

    pub fn on_tick<D>(
        &mut self,
        surface: SurfaceId,
        now: Instant,
        pull_drawable: impl FnOnce() -> Option<D>,
    ) -> Option<FrameRequest<D>> {
        if !self.state.accepts(surface) {
            return None;
        }
        let drawable = pull_drawable()?;
        let (frame_index, dt) = self.state.advance(now);

        Some(FrameRequest {
            drawable,
            timing: FrameTiming {
                timestamp: now,
                presentation_timestamp: None,
                target_timestamp: None,
                force_wait: true,
            },
            frame_index,
            dt,
        })
    }
}

impl Default for FixedRateClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Clock driven by a display link that hands out drawables along with
/// target timestamps.
#[derive(Debug, Clone)]
pub struct VariableRateClock {
    state: ClockState,
}

impl VariableRateClock {
    pub fn new() -> Self {
        Self { state: ClockState::new() }
    }

    pub fn on_update<D>(&mut self, surface: SurfaceId, update: DisplayUpdate<D>) -> Option<FrameRequest<D>> {
        if !self.state.accepts(surface) {
            return None;
        }
        let (frame_index, dt) = self.state.advance(update.target_timestamp);

        Some(FrameRequest {
            drawable: update.drawable,
            timing: FrameTiming {
                timestamp: update.target_timestamp,
                presentation_timestamp: Some(update.target_presentation_timestamp),
                target_timestamp: Some(update.target_presentation_timestamp),
                force_wait: false,
            },
            frame_index,
            dt,
        })
    }
}

impl Default for VariableRateClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Frame timing source of a view: either variant, behind one interface.
///
/// Both variants produce `FrameRequest`s with the same shape, so the
/// renderer never needs to know which one is running.
#[derive(Debug, Clone)]
pub enum FrameClock {
    Fixed(FixedRateClock),
    Variable(VariableRateClock),
}

impl FrameClock {
    /// Picks the variable-rate clock when the platform offers one.
    pub fn select(caps: ClockCapabilities) -> Self {
        if caps.variable_rate {
            FrameClock::Variable(VariableRateClock::new())
        } else {
            FrameClock::Fixed(FixedRateClock::new())
        }
    }

    fn state(&self) -> &ClockState {
        match self {
            FrameClock::Fixed(c) => &c.state,
            FrameClock::Variable(c) => &c.state,
        }
    }

    fn state_mut(&mut self) -> &mut ClockState {
        match self {
            FrameClock::Fixed(c) => &mut c.state,
            FrameClock::Variable(c) => &mut c.state,
        }
    }

    /// Starts delivering frames for `surface`.
    pub fn attach(&mut self, surface: SurfaceId) {
        let state = self.state_mut();
        if state.attached != Some(surface) {
            log::debug!("frame clock: attached to surface {}", surface.raw());
        }
        state.attached = Some(surface);
        state.last = None;
    }

    /// Stops delivering frames. Calling it again is a no-op.
    pub fn detach(&mut self) {
        if let Some(surface) = self.state_mut().attached.take() {
            log::debug!("frame clock: detached from surface {}", surface.raw());
        }
    }

    /// Tears the attachment down and rebuilds it, e.g. after the surface
    /// was recreated.
    pub fn reattach(&mut self, surface: SurfaceId) {
        self.detach();
        self.attach(surface);
    }

    pub fn attached(&self) -> Option<SurfaceId> {
        self.state().attached
    }

    pub fn pause(&mut self) {
        self.set_paused(true);
    }

    /// Resumes delivery. The next frame starts a fresh delta-time baseline.
    pub fn resume(&mut self) {
        self.set_paused(false);
    }

    pub fn set_paused(&mut self, paused: bool) {
        let state = self.state_mut();
        if state.paused && !paused {
            state.last = None;
        }
        state.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.state().paused
    }

    pub fn is_fixed_rate(&self) -> bool {
        matches!(self, FrameClock::Fixed(_))
    }

    /// Frames delivered so far.
    pub fn frame_index(&self) -> u64 {
        self.state().frame_index
    }

    /// Fixed-rate tick. Ignored by a variable-rate clock.
    pub fn on_tick<D>(
        &mut self,
        surface: SurfaceId,
        now: Instant,
        pull_drawable: impl FnOnce() -> Option<D>,
    ) -> Option<FrameRequest<D>> {
        match self {
            FrameClock::Fixed(c) => c.on_tick(surface, now, pull_drawable),
            FrameClock::Variable(_) => None,
        }
    }

    /// Variable-rate update. Ignored by a fixed-rate clock.
    pub fn on_update<D>(&mut self, surface: SurfaceId, update: DisplayUpdate<D>) -> Option<FrameRequest<D>> {
        match self {
            FrameClock::Variable(c) => c.on_update(surface, update),
            FrameClock::Fixed(_) => None,
        }
    }
}
