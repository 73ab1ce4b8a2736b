use std::num::NonZeroU64;

use bytemuck::Pod;

use super::UniformRing;

/// GPU mirror of a `UniformRing`: one uniform buffer and one bind group per
/// host slot.
///
/// Buffers are reallocated whenever the host ring grows; every host slot is
/// uploaded at that point so older slots keep their contents. Otherwise only
/// the bytes written into the current slot this frame are uploaded.
pub struct GpuUniformRing {
    label: &'static str,
    buffers: Vec<wgpu::Buffer>,
    bind_groups: Vec<wgpu::BindGroup>,
    generation: Option<u64>,
    slot: usize,
}

impl GpuUniformRing {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            buffers: Vec::new(),
            bind_groups: Vec::new(),
            generation: None,
            slot: 0,
        }
    }

    /// Brings the GPU buffers in line with `ring` for the current frame.
    ///
    /// `bind` builds the bind group for one buffer; it receives a binding
    /// covering a single item so dynamic offsets stay in range.
    ///
    /// An empty ring (never written) leaves the mirror untouched.
    pub fn sync<T, F>(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, ring: &UniformRing<T>, mut bind: F)
    where
        T: Pod,
        F: FnMut(&wgpu::Device, wgpu::BufferBinding<'_>) -> wgpu::BindGroup,
    {
        if ring.capacity() == 0 {
            return;
        }

        if self.generation != Some(ring.generation()) {
            self.reallocate(device, ring, &mut bind);
            for (slot, buffer) in self.buffers.iter().enumerate() {
                queue.write_buffer(buffer, 0, ring.slot_bytes(slot));
            }
            self.generation = Some(ring.generation());
        } else {
            let bytes = ring.current_bytes();
            if !bytes.is_empty() {
                queue.write_buffer(&self.buffers[ring.current_slot()], 0, bytes);
            }
        }

        self.slot = ring.current_slot();
    }

    fn reallocate<T, F>(&mut self, device: &wgpu::Device, ring: &UniformRing<T>, bind: &mut F)
    where
        T: Pod,
        F: FnMut(&wgpu::Device, wgpu::BufferBinding<'_>) -> wgpu::BindGroup,
    {
        let size = ring.slot_len() as u64;
        let max = device.limits().max_buffer_size;
        if size > max {
            log::error!(
                "{}: {} bytes exceed the device buffer limit of {} bytes",
                self.label,
                size,
                max
            );
            panic!("{}: uniform buffer allocation beyond device limits", self.label);
        }

        let binding_size = NonZeroU64::new(std::mem::size_of::<T>().max(1) as u64);

        self.buffers.clear();
        self.bind_groups.clear();
        for _ in 0..ring.depth() {
            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(self.label),
                size,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let group = bind(
                device,
                wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: binding_size,
                },
            );
            self.buffers.push(buffer);
            self.bind_groups.push(group);
        }

        log::debug!(
            "{}: allocated {} buffers of {} bytes",
            self.label,
            ring.depth(),
            size
        );
    }

    pub fn current_buffer(&self) -> Option<&wgpu::Buffer> {
        self.buffers.get(self.slot)
    }

    pub fn current_bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.bind_groups.get(self.slot)
    }

    /// Number of GPU buffers currently allocated.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}
