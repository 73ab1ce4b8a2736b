//! Frame timing.
//!
//! A view owns one `FrameClock`, attached to its surface. Platform display
//! signals are fed into the clock, which turns them into `FrameRequest`s
//! with uniform timing semantics:
//! - fixed-rate ticks: present immediately, wait for scheduling
//! - variable-rate updates: present at the target presentation time

mod frame_clock;

pub use frame_clock::{
    ClockCapabilities, DisplayUpdate, FixedRateClock, FrameClock, FrameRequest, SurfaceId,
    VariableRateClock,
};
