use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Counting semaphore bounding the number of frames in flight.
///
/// `acquire` blocks while every permit is held. A permit is returned when its
/// `FramePermit` is dropped, which normally happens in the completion callback
/// of the submitted frame.
#[derive(Debug, Clone)]
pub struct FrameGate {
    inner: Arc<GateInner>,
}

#[derive(Debug)]
struct GateInner {
    available: Mutex<usize>,
    released: Condvar,
    capacity: usize,
}

impl FrameGate {
    /// Creates a gate holding `permits` permits (at least one).
    pub fn new(permits: usize) -> Self {
        let capacity = permits.max(1);
        Self {
            inner: Arc::new(GateInner {
                available: Mutex::new(capacity),
                released: Condvar::new(),
                capacity,
            }),
        }
    }

    /// Blocks until a permit is free and takes it.
    pub fn acquire(&self) -> FramePermit {
        let mut available = self.inner.available.lock();
        while *available == 0 {
            self.inner.released.wait(&mut available);
        }
        *available -= 1;
        self.permit()
    }

    /// Takes a permit if one is free right now.
    pub fn try_acquire(&self) -> Option<FramePermit> {
        let mut available = self.inner.available.lock();
        if *available == 0 {
            return None;
        }
        *available -= 1;
        Some(self.permit())
    }

    /// Like `acquire`, giving up after `timeout`.
    pub fn acquire_timeout(&self, timeout: Duration) -> Option<FramePermit> {
        let deadline = Instant::now() + timeout;
        let mut available = self.inner.available.lock();
        while *available == 0 {
            if self.inner.released.wait_until(&mut available, deadline).timed_out() && *available == 0 {
                return None;
            }
        }
        *available -= 1;
        Some(self.permit())
    }

    /// Permits currently free.
    pub fn available(&self) -> usize {
        *self.inner.available.lock()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    fn permit(&self) -> FramePermit {
        FramePermit {
            gate: Some(self.inner.clone()),
        }
    }
}

/// One in-flight frame. Releases its permit exactly once, on drop.
#[derive(Debug)]
#[must_use = "dropping a permit releases it immediately"]
pub struct FramePermit {
    gate: Option<Arc<GateInner>>,
}

impl FramePermit {
    /// Releases the permit now.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(gate) = self.gate.take() {
            let mut available = gate.available.lock();
            debug_assert!(*available < gate.capacity);
            *available += 1;
            drop(available);
            gate.released.notify_one();
        }
    }
}

impl Drop for FramePermit {
    fn drop(&mut self) {
        self.release_inner();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    #[test]
    fn starts_full() {
        let gate = FrameGate::new(3);
        assert_eq!(gate.capacity(), 3);
        assert_eq!(gate.available(), 3);
    }

    #[test]
    fn zero_permits_is_clamped() {
        let gate = FrameGate::new(0);
        assert_eq!(gate.capacity(), 1);
    }

    #[test]
    fn drop_releases_once() {
        let gate = FrameGate::new(2);
        let a = gate.acquire();
        let b = gate.acquire();
        assert_eq!(gate.available(), 0);
        assert!(gate.try_acquire().is_none());

        drop(a);
        assert_eq!(gate.available(), 1);
        b.release();
        assert_eq!(gate.available(), 2);
    }

    #[test]
    fn timeout_gives_up_when_exhausted() {
        let gate = FrameGate::new(1);
        let _held = gate.acquire();
        assert!(gate.acquire_timeout(Duration::from_millis(20)).is_none());
        assert_eq!(gate.available(), 0);
    }

    #[test]
    fn acquire_blocks_until_released_elsewhere() {
        let gate = FrameGate::new(1);
        let held = gate.acquire();
        let acquired = Arc::new(AtomicBool::new(false));

        let waiter = {
            let gate = gate.clone();
            let acquired = acquired.clone();
            thread::spawn(move || {
                let _permit = gate.acquire();
                acquired.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!acquired.load(Ordering::SeqCst));

        // Completion callbacks release permits from another thread.
        thread::spawn(move || drop(held)).join().unwrap();
        waiter.join().unwrap();
        assert!(acquired.load(Ordering::SeqCst));
        assert_eq!(gate.available(), 1);
    }

    #[test]
    fn one_release_wakes_exactly_one_waiter() {
        let gate = FrameGate::new(3);
        let held: Vec<_> = (0..3).map(|_| gate.acquire()).collect();
        assert_eq!(gate.available(), 0);

        let (tx, rx) = std::sync::mpsc::channel();
        let waiters: Vec<_> = (0..2)
            .map(|_| {
                let gate = gate.clone();
                let tx = tx.clone();
                thread::spawn(move || tx.send(gate.acquire()).unwrap())
            })
            .collect();

        thread::sleep(Duration::from_millis(50));
        assert!(rx.try_recv().is_err());

        let mut held = held.into_iter();
        drop(held.next());

        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        assert_eq!(gate.available(), 0);

        drop(held.next());
        let second = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        for w in waiters {
            w.join().unwrap();
        }
        assert_eq!(gate.available(), 0);

        drop((first, second));
        drop(held);
        assert_eq!(gate.available(), 3);
    }

    #[test]
    fn never_exceeds_capacity_under_contention() {
        let gate = FrameGate::new(3);
        let in_flight = Arc::new(Mutex::new(0usize));
        let peak = Arc::new(Mutex::new(0usize));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let gate = gate.clone();
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                thread::spawn(move || {
                    for _ in 0..20 {
                        let permit = gate.acquire();
                        {
                            let mut n = in_flight.lock();
                            *n += 1;
                            let mut p = peak.lock();
                            *p = (*p).max(*n);
                        }
                        thread::yield_now();
                        *in_flight.lock() -= 1;
                        drop(permit);
                    }
                })
            })
            .collect();

        for w in workers {
            w.join().unwrap();
        }
        assert!(*peak.lock() <= 3);
        assert_eq!(gate.available(), 3);
    }
}
