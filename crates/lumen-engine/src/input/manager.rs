use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::{InputEvent, InputEventKind};

/// How long an unfetched event stays queued.
pub const EVENT_RETENTION: Duration = Duration::from_secs(1);

/// Thread-safe queue of timestamped input events.
///
/// Platform glue adds events from the UI thread; the frame callback fetches
/// everything up to the frame's timestamp. Events nobody fetches expire after
/// `EVENT_RETENTION`.
#[derive(Debug, Default)]
pub struct InputManager {
    events: Mutex<Vec<InputEvent>>,
}

impl InputManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `kind` stamped with the current time.
    pub fn add(&self, kind: InputEventKind) {
        self.add_at(kind, Instant::now());
    }

    /// Queues `kind` with a platform-provided timestamp.
    pub fn add_at(&self, kind: InputEventKind, timestamp: Instant) {
        let mut events = self.events.lock();
        events.push(InputEvent { timestamp, kind });

        if let Some(cutoff) = Instant::now().checked_sub(EVENT_RETENTION) {
            events.retain(|e| e.timestamp >= cutoff);
        }
    }

    /// Removes and returns, in insertion order, every event stamped at or
    /// before `until`. Newer events stay queued.
    pub fn fetch(&self, until: Instant) -> Vec<InputEvent> {
        let mut events = self.events.lock();
        let (due, rest): (Vec<_>, Vec<_>) = events.drain(..).partition(|e| e.timestamp <= until);
        *events = rest;
        due
    }

    pub fn fetch_now(&self) -> Vec<InputEvent> {
        self.fetch(Instant::now())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn key(code: u16) -> InputEventKind {
        InputEventKind::KeyDown { key_code: code }
    }

    #[test]
    fn fetch_returns_due_events_in_order() {
        let input = InputManager::new();
        let now = Instant::now();
        input.add_at(key(1), now);
        input.add_at(key(2), now + Duration::from_millis(500));
        input.add_at(key(3), now);

        let due = input.fetch(now);
        let codes: Vec<_> = due.iter().map(|e| e.kind).collect();
        assert_eq!(codes, vec![key(1), key(3)]);
        assert_eq!(input.len(), 1);

        let rest = input.fetch(now + Duration::from_secs(1));
        assert_eq!(rest.len(), 1);
        assert!(input.is_empty());
    }

    #[test]
    fn fetched_events_are_gone() {
        let input = InputManager::new();
        input.add(key(1));
        assert_eq!(input.fetch_now().len(), 1);
        assert!(input.fetch_now().is_empty());
    }

    #[test]
    fn stale_events_expire_on_insert() {
        let input = InputManager::new();
        let now = Instant::now();
        if let Some(old) = now.checked_sub(Duration::from_secs(3)) {
            input.add_at(key(1), old);
            input.add_at(key(2), now);
            let kinds: Vec<_> = input.fetch(now).iter().map(|e| e.kind).collect();
            assert_eq!(kinds, vec![key(2)]);
        }
    }

    #[test]
    fn concurrent_producers() {
        let input = Arc::new(InputManager::new());
        let producers: Vec<_> = (0..4)
            .map(|t| {
                let input = input.clone();
                thread::spawn(move || {
                    for i in 0..50 {
                        input.add(key(t * 100 + i));
                    }
                })
            })
            .collect();
        for p in producers {
            p.join().unwrap();
        }
        assert_eq!(input.fetch_now().len(), 200);
    }
}
