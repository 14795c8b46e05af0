//! A GPU buffer that grows on demand, doubling like a `Vec`'s allocation.
//!
//! Every per-terminal vertex/index stream (grid rects, grid glyphs, overlay
//! rects, overlay glyphs) needs this same grow-and-reupload behavior, so it's
//! factored out instead of repeated per stream.

pub struct GrowableBuffer {
    buffer: Option<wgpu::Buffer>,
    capacity: usize,
    usage: wgpu::BufferUsages,
    label: &'static str,
}

impl GrowableBuffer {
    pub fn new(usage: wgpu::BufferUsages, label: &'static str) -> Self {
        Self { buffer: None, capacity: 0, usage, label }
    }

    /// Upload `data`, growing the backing buffer first if it's too small.
    /// A no-op on an empty slice so callers don't need to special-case it.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        if self.buffer.is_none() || data.len() > self.capacity {
            let new_cap = data.len().next_power_of_two().max(4096);
            self.buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(self.label),
                size: new_cap as u64,
                usage: self.usage,
                mapped_at_creation: false,
            }));
            self.capacity = new_cap;
        }
        queue.write_buffer(self.buffer.as_ref().unwrap(), 0, data);
    }

    pub fn slice(&self) -> Option<wgpu::BufferSlice<'_>> {
        self.buffer.as_ref().map(|b| b.slice(..))
    }
}
