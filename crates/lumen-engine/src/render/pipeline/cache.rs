use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::{Condvar, Mutex};

use crate::render::PipelineError;

/// Pixel format pair a set of pipelines is built for.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct PipelineKey {
    pub color: wgpu::TextureFormat,
    pub depth_stencil: wgpu::TextureFormat,
}

impl PipelineKey {
    pub fn new(color: wgpu::TextureFormat, depth_stencil: wgpu::TextureFormat) -> Self {
        Self { color, depth_stencil }
    }
}

/// Observed state of one cache entry.
#[derive(Debug)]
pub enum PipelineState<V> {
    /// Compilation is running on a background thread.
    Pending,
    Ready(Arc<V>),
    Failed(Arc<PipelineError>),
}

impl<V> Clone for PipelineState<V> {
    fn clone(&self) -> Self {
        match self {
            Self::Pending => Self::Pending,
            Self::Ready(v) => Self::Ready(v.clone()),
            Self::Failed(e) => Self::Failed(e.clone()),
        }
    }
}

impl<V> PipelineState<V> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn ready(&self) -> Option<&Arc<V>> {
        match self {
            Self::Ready(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&Arc<PipelineError>> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}

type Compiler<V> = dyn Fn(PipelineKey) -> Result<V, PipelineError> + Send + Sync;

/// Lazily populated pipeline table keyed by format pair.
///
/// The first lookup of a key inserts a `Pending` entry and compiles on a
/// background thread; later lookups return whatever state the entry is in.
/// A key is compiled at most once until `retry` discards a failed entry.
pub struct PipelineCache<V> {
    compiler: Arc<Compiler<V>>,
    entries: Mutex<HashMap<PipelineKey, Arc<Slot<V>>>>,
    compilations: AtomicUsize,
}

struct Slot<V> {
    state: Mutex<PipelineState<V>>,
    settled: Condvar,
}

impl<V> Slot<V> {
    fn settle(&self, result: Result<V, PipelineError>) {
        let mut state = self.state.lock();
        *state = match result {
            Ok(v) => PipelineState::Ready(Arc::new(v)),
            Err(e) => PipelineState::Failed(Arc::new(e)),
        };
        drop(state);
        self.settled.notify_all();
    }
}

impl<V: Send + Sync + 'static> PipelineCache<V> {
    pub fn new<F>(compiler: F) -> Self
    where
        F: Fn(PipelineKey) -> Result<V, PipelineError> + Send + Sync + 'static,
    {
        Self {
            compiler: Arc::new(compiler),
            entries: Mutex::new(HashMap::new()),
            compilations: AtomicUsize::new(0),
        }
    }

    /// Returns the entry for `key`, starting compilation on a miss.
    pub fn lookup(&self, key: PipelineKey) -> PipelineState<V> {
        let slot = {
            let mut entries = self.entries.lock();
            if let Some(slot) = entries.get(&key) {
                return slot.state.lock().clone();
            }
            let slot = Arc::new(Slot {
                state: Mutex::new(PipelineState::Pending),
                settled: Condvar::new(),
            });
            entries.insert(key, slot.clone());
            slot
        };

        self.compilations.fetch_add(1, Ordering::Relaxed);
        log::debug!("pipeline cache: compiling {:?} / {:?}", key.color, key.depth_stencil);

        let compiler = self.compiler.clone();
        let worker_slot = slot.clone();
        let spawned = thread::Builder::new()
            .name("pipeline-compile".to_string())
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| compiler(key)))
                    .unwrap_or_else(|payload| Err(PipelineError::Panicked(panic_message(&*payload))));
                if let Err(err) = &result {
                    log::error!("pipeline cache: {:?} / {:?} failed: {}", key.color, key.depth_stencil, err);
                }
                worker_slot.settle(result);
            });

        if let Err(err) = spawned {
            slot.settle(Err(PipelineError::Spawn(err.to_string())));
        }

        let state = slot.state.lock().clone();
        state
    }

    /// Blocks until the entry for `key` has settled.
    ///
    /// Returns `None` for a key that was never looked up.
    pub fn wait(&self, key: PipelineKey) -> Option<PipelineState<V>> {
        let slot = self.entries.lock().get(&key).cloned()?;
        let mut state = slot.state.lock();
        while state.is_pending() {
            slot.settled.wait(&mut state);
        }
        Some(state.clone())
    }

    /// Discards a failed entry so the next lookup compiles again.
    ///
    /// Returns `true` when an entry was removed. Pending and ready entries
    /// are left alone.
    pub fn retry(&self, key: PipelineKey) -> bool {
        let mut entries = self.entries.lock();
        let failed = entries
            .get(&key)
            .is_some_and(|slot| slot.state.lock().error().is_some());
        if failed {
            entries.remove(&key);
            log::debug!("pipeline cache: cleared failed {:?} / {:?}", key.color, key.depth_stencil);
        }
        failed
    }

    /// Number of compilations started so far.
    pub fn compilations(&self) -> usize {
        self.compilations.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "pipeline compilation panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    use wgpu::TextureFormat as F;

    fn key(color: F) -> PipelineKey {
        PipelineKey::new(color, F::Depth24PlusStencil8)
    }

    #[test]
    fn same_key_compiles_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let cache = PipelineCache::new(move |k: PipelineKey| {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok(k.color)
        });

        let k = key(F::Bgra8Unorm);
        for _ in 0..10 {
            let _ = cache.lookup(k);
        }
        let settled = cache.wait(k).unwrap();
        assert_eq!(settled.ready().map(|v| **v), Some(F::Bgra8Unorm));
        let _ = cache.lookup(k);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.compilations(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn first_lookup_is_pending_while_compiling() {
        let release = Arc::new(AtomicBool::new(false));
        let gate = release.clone();
        let cache = PipelineCache::new(move |_| {
            while !gate.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(1));
            }
            Ok(())
        });

        let k = key(F::Bgra8Unorm);
        assert!(cache.lookup(k).is_pending());
        assert!(cache.lookup(k).is_pending());

        release.store(true, Ordering::SeqCst);
        assert!(cache.wait(k).unwrap().ready().is_some());
    }

    #[test]
    fn keys_are_independent() {
        let cache = PipelineCache::new(|k: PipelineKey| {
            if k.color == F::Rgba16Float {
                Err(PipelineError::UnsupportedFormat {
                    format: k.color,
                    reason: "test".into(),
                })
            } else {
                Ok(())
            }
        });

        let good = key(F::Bgra8Unorm);
        let bad = key(F::Rgba16Float);
        cache.lookup(good);
        cache.lookup(bad);

        assert!(cache.wait(good).unwrap().ready().is_some());
        assert!(cache.wait(bad).unwrap().error().is_some());
        assert_eq!(cache.compilations(), 2);
    }

    #[test]
    fn failures_are_sticky_until_retry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let cache: PipelineCache<()> = PipelineCache::new(move |_| {
            counted.fetch_add(1, Ordering::SeqCst);
            Err(PipelineError::Validation("broken".into()))
        });

        let k = key(F::Bgra8Unorm);
        cache.lookup(k);
        assert!(cache.wait(k).unwrap().error().is_some());
        assert!(cache.lookup(k).error().is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(cache.retry(k));
        cache.lookup(k);
        cache.wait(k);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn retry_leaves_ready_entries() {
        let cache = PipelineCache::new(|_| Ok(1u32));
        let k = key(F::Bgra8Unorm);
        cache.lookup(k);
        cache.wait(k);
        assert!(!cache.retry(k));
        assert!(!cache.retry(key(F::Rgba8Unorm)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn panicking_compiler_settles_as_failure() {
        let cache: PipelineCache<()> = PipelineCache::new(|_| panic!("shader exploded"));
        let k = key(F::Bgra8Unorm);
        cache.lookup(k);
        let state = cache.wait(k).unwrap();
        let err = state.error().unwrap();
        assert!(err.to_string().contains("shader exploded"));
    }

    #[test]
    fn wait_on_unknown_key_is_none() {
        let cache = PipelineCache::new(|_| Ok(()));
        assert!(cache.wait(key(F::Bgra8Unorm)).is_none());
    }
}
