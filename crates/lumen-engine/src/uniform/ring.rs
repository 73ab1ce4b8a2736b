use std::marker::PhantomData;

use bytemuck::Pod;

use super::FrameCounter;

/// Smallest growth step accepted by `UniformRing`.
pub const MIN_STEP: usize = 4;

/// Host side of a multi-buffered uniform array.
///
/// The ring keeps `depth` byte slots of `stride * capacity` bytes each. Items
/// are written into the slot selected by the shared `FrameCounter`, so the
/// GPU can still read the slots of frames that are in flight.
///
/// Capacity only grows. Growth rounds up to whole steps and resizes every
/// slot together, so any slot can hold any index the ring has ever accepted.
#[derive(Debug)]
pub struct UniformRing<T: Pod> {
    counter: FrameCounter,
    slots: Vec<Vec<u8>>,
    capacity: usize,
    stride: usize,
    step: usize,
    generation: u64,
    written: usize,
    _marker: PhantomData<T>,
}

impl<T: Pod> UniformRing<T> {
    /// Creates a ring with one slot per counter position.
    pub fn new(counter: FrameCounter, step: usize, alignment: usize) -> Self {
        let depth = counter.depth();
        Self::with_depth(counter, depth, step, alignment)
    }

    /// Creates a ring with an explicit slot count.
    ///
    /// `alignment` is the device's dynamic offset alignment; every item
    /// starts on a multiple of it.
    pub fn with_depth(counter: FrameCounter, depth: usize, step: usize, alignment: usize) -> Self {
        let depth = depth.max(1);
        let stride = align_up(std::mem::size_of::<T>().max(1), alignment.max(4));

        Self {
            counter,
            slots: vec![Vec::new(); depth],
            capacity: 0,
            stride,
            step: step.max(MIN_STEP),
            generation: 0,
            written: 0,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub fn step(&self) -> usize {
        self.step
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.slots.len()
    }

    /// Bumped every time the slots are reallocated.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Total bytes of one slot.
    #[inline]
    pub fn slot_len(&self) -> usize {
        self.stride * self.capacity
    }

    /// Slot written by `set_value` in the current frame.
    #[inline]
    pub fn current_slot(&self) -> usize {
        self.counter.current() % self.slots.len()
    }

    /// Resets the per-frame write mark. Called once per frame after the
    /// counter advanced.
    pub fn begin_frame(&mut self) {
        self.written = 0;
    }

    /// Byte offset of `index`, growing the ring first if needed.
    pub fn offset_for_item(&mut self, index: usize) -> u64 {
        self.ensure_capacity(index);
        (self.stride * index) as u64
    }

    /// Writes `value` at `index` in the current slot.
    pub fn set_value(&mut self, value: &T, index: usize) {
        self.ensure_capacity(index);

        let slot = self.current_slot();
        let offset = self.stride * index;
        let bytes = bytemuck::bytes_of(value);
        self.slots[slot][offset..offset + bytes.len()].copy_from_slice(bytes);
        self.written = self.written.max(offset + self.stride);
    }

    /// Reads back the item at `index` of `slot`.
    pub fn value_at(&self, slot: usize, index: usize) -> Option<T> {
        if index >= self.capacity {
            return None;
        }
        let bytes = self.slots.get(slot)?;
        let offset = self.stride * index;
        let size = std::mem::size_of::<T>();
        Some(bytemuck::pod_read_unaligned(&bytes[offset..offset + size]))
    }

    /// Full contents of `slot`.
    pub fn slot_bytes(&self, slot: usize) -> &[u8] {
        self.slots.get(slot).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Bytes of the current slot written since `begin_frame`.
    pub fn current_bytes(&self) -> &[u8] {
        &self.slots[self.current_slot()][..self.written]
    }

    /// Grows every slot so `index` is addressable.
    ///
    /// Returns `true` when the slots were reallocated. Existing contents are
    /// preserved. Failure to allocate is not recoverable.
    pub fn ensure_capacity(&mut self, index: usize) -> bool {
        if index < self.capacity {
            return false;
        }

        let new_capacity = (index / self.step + 1) * self.step;
        let Some(new_len) = new_capacity.checked_mul(self.stride) else {
            log::error!(
                "uniform ring: {} items of {} bytes overflow the address space",
                new_capacity,
                self.stride
            );
            panic!("uniform ring size overflow");
        };

        for slot in &mut self.slots {
            let additional = new_len - slot.len();
            if let Err(err) = slot.try_reserve_exact(additional) {
                log::error!("uniform ring: failed to grow to {} bytes: {}", new_len, err);
                panic!("uniform ring allocation failed: {err}");
            }
            slot.resize(new_len, 0);
        }

        log::debug!(
            "uniform ring<{}>: capacity {} -> {}",
            std::any::type_name::<T>(),
            self.capacity,
            new_capacity
        );

        self.capacity = new_capacity;
        self.generation += 1;
        true
    }
}

#[inline]
pub(crate) fn align_up(value: usize, alignment: usize) -> usize {
    value.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uniform::MeshUniform;
    use glam::Mat4;

    fn ring(step: usize) -> (FrameCounter, UniformRing<MeshUniform>) {
        let counter = FrameCounter::new(3);
        let ring = UniformRing::new(counter.clone(), step, 256);
        (counter, ring)
    }

    // ── layout ──────────────────────────────────────────────────────────

    #[test]
    fn stride_respects_alignment() {
        let (_, r) = ring(4);
        assert_eq!(r.stride(), 256);

        let counter = FrameCounter::new(1);
        let tight: UniformRing<MeshUniform> = UniformRing::new(counter, 4, 4);
        assert_eq!(tight.stride(), 64);
    }

    #[test]
    fn step_is_clamped() {
        let (_, r) = ring(1);
        assert_eq!(r.step(), MIN_STEP);
    }

    #[test]
    fn starts_empty() {
        let (_, r) = ring(4);
        assert_eq!(r.capacity(), 0);
        assert_eq!(r.generation(), 0);
        assert!(r.current_bytes().is_empty());
        assert_eq!(r.value_at(0, 0), None);
    }

    // ── growth ──────────────────────────────────────────────────────────

    #[test]
    fn grows_in_whole_steps() {
        let (_, mut r) = ring(4);
        assert!(r.ensure_capacity(0));
        assert_eq!(r.capacity(), 4);
        assert!(!r.ensure_capacity(3));
        assert!(r.ensure_capacity(4));
        assert_eq!(r.capacity(), 8);
        assert!(r.ensure_capacity(17));
        assert_eq!(r.capacity(), 20);
        assert_eq!(r.generation(), 3);
    }

    #[test]
    fn capacity_never_shrinks() {
        let (_, mut r) = ring(4);
        r.ensure_capacity(30);
        let cap = r.capacity();
        r.ensure_capacity(0);
        assert_eq!(r.capacity(), cap);
        assert_eq!(cap % r.step(), 0);
    }

    #[test]
    fn growth_preserves_every_slot() {
        let (counter, mut r) = ring(4);
        let mut expected = Vec::new();
        for slot in 0..3 {
            let m = MeshUniform::new(Mat4::from_scale(glam::Vec3::splat(slot as f32 + 1.0)));
            assert_eq!(r.current_slot(), slot);
            r.set_value(&m, 2);
            expected.push(m);
            counter.tick();
        }

        r.ensure_capacity(100);
        for (slot, m) in expected.iter().enumerate() {
            assert_eq!(r.value_at(slot, 2), Some(*m));
        }
        assert_eq!(r.slot_bytes(0).len(), r.slot_len());
    }

    // ── writes ──────────────────────────────────────────────────────────

    #[test]
    fn offsets_are_stride_multiples() {
        let (_, mut r) = ring(4);
        assert_eq!(r.offset_for_item(0), 0);
        assert_eq!(r.offset_for_item(5), 5 * 256);
        assert!(r.capacity() > 5);
    }

    #[test]
    fn set_value_writes_current_slot_only() {
        let (counter, mut r) = ring(4);
        counter.tick();
        let m = MeshUniform::new(Mat4::from_translation(glam::Vec3::X));
        r.set_value(&m, 1);

        assert_eq!(r.value_at(1, 1), Some(m));
        assert_eq!(r.value_at(0, 1), Some(MeshUniform { model: [[0.0; 4]; 4] }));
    }

    #[test]
    fn write_mark_tracks_highest_item() {
        let (_, mut r) = ring(4);
        r.begin_frame();
        r.set_value(&MeshUniform::default(), 2);
        r.set_value(&MeshUniform::default(), 0);
        assert_eq!(r.current_bytes().len(), 3 * 256);

        r.begin_frame();
        assert!(r.current_bytes().is_empty());
    }

    #[test]
    fn rings_sharing_a_counter_advance_together() {
        let counter = FrameCounter::new(3);
        let a: UniformRing<MeshUniform> = UniformRing::new(counter.clone(), 4, 4);
        let b: UniformRing<MeshUniform> = UniformRing::new(counter.clone(), 512, 4);
        for _ in 0..5 {
            counter.tick();
            assert_eq!(a.current_slot(), b.current_slot());
        }
    }

    #[test]
    fn align_up_rounds() {
        assert_eq!(align_up(64, 256), 256);
        assert_eq!(align_up(256, 256), 256);
        assert_eq!(align_up(257, 256), 512);
        assert_eq!(align_up(80, 4), 80);
    }
}
