use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared frame slot selector.
///
/// Every `UniformRing` owned by one renderer holds a clone of the same counter,
/// so a single `tick` advances all of them to the same slot.
#[derive(Debug, Clone)]
pub struct FrameCounter {
    inner: Arc<CounterInner>,
}

#[derive(Debug)]
struct CounterInner {
    ticks: AtomicUsize,
    depth: usize,
}

impl FrameCounter {
    /// Creates a counter cycling through `depth` slots (at least one).
    pub fn new(depth: usize) -> Self {
        Self {
            inner: Arc::new(CounterInner {
                ticks: AtomicUsize::new(0),
                depth: depth.max(1),
            }),
        }
    }

    /// Number of slots cycled through.
    #[inline]
    pub fn depth(&self) -> usize {
        self.inner.depth
    }

    /// Advances to the next slot and returns it.
    pub fn tick(&self) -> usize {
        let prev = self.inner.ticks.fetch_add(1, Ordering::AcqRel);
        prev.wrapping_add(1) % self.inner.depth
    }

    /// Slot selected by the most recent `tick` (0 before the first one).
    #[inline]
    pub fn current(&self) -> usize {
        self.inner.ticks.load(Ordering::Acquire) % self.inner.depth
    }

    /// Total number of ticks so far.
    #[inline]
    pub fn ticks(&self) -> usize {
        self.inner.ticks.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycles_through_depth() {
        let c = FrameCounter::new(3);
        assert_eq!(c.current(), 0);
        assert_eq!(c.tick(), 1);
        assert_eq!(c.tick(), 2);
        assert_eq!(c.tick(), 0);
        assert_eq!(c.current(), 0);
        assert_eq!(c.ticks(), 3);
    }

    #[test]
    fn clones_share_state() {
        let a = FrameCounter::new(2);
        let b = a.clone();
        a.tick();
        assert_eq!(b.current(), 1);
    }

    #[test]
    fn zero_depth_is_clamped() {
        let c = FrameCounter::new(0);
        assert_eq!(c.depth(), 1);
        assert_eq!(c.tick(), 0);
    }
}
