//! # Device Buffers
//!
//! Host-mappable storage buffers used for kernel inputs and outputs.
//!
//! ## Memory placement
//! Every buffer is created with `STORAGE | MAP_READ | MAP_WRITE`. With
//! `MAPPABLE_PRIMARY_BUFFERS` enabled this makes wgpu back the buffer with a
//! host-visible, host-coherent memory type, so:
//! * an upload is *map → copy → unmap*,
//! * a download is *map → copy → unmap*,
//! * no explicit flush or invalidate is ever issued.
//!
//! ## Sizes
//! The allocated size is the requested size rounded up to the 4-byte copy
//! alignment (minimum 4 bytes, since empty storage bindings are invalid).
//! Host slices must match the **requested** size exactly; the padding tail
//! is never exposed.
//!
//! ## Lifetime
//! A [`DeviceBuffer`] destroys its buffer on drop, releasing the backing
//! memory synchronously rather than when the last internal reference dies.

use std::sync::mpsc;

use tracing::debug;

use crate::engine::error::{GpuError, GpuResult};
use crate::gpu::GpuContext;

/// How a buffer participates in a dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferRole {
    /// Written by the host once, read by the kernel.
    Input,

    /// Written by the kernel, read by the host once after completion.
    Output,
}

impl BufferRole {
    fn label(self) -> &'static str {
        match self {
            BufferRole::Input => "bench_input",
            BufferRole::Output => "bench_output",
        }
    }
}

/// A storage buffer in host-mappable device memory.
#[derive(Debug)]
pub struct DeviceBuffer {
    buffer: wgpu::Buffer,
    requested: u64,
    role: BufferRole,
}

impl DeviceBuffer {
    /// Usage flags of every buffer created by the engine.
    pub const USAGE: wgpu::BufferUsages = wgpu::BufferUsages::STORAGE
        .union(wgpu::BufferUsages::MAP_READ)
        .union(wgpu::BufferUsages::MAP_WRITE);

    /// Allocated size for a request of `size` bytes.
    #[inline]
    pub fn allocation_size(size: u64) -> u64 {
        size.max(wgpu::COPY_BUFFER_ALIGNMENT)
            .next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT)
    }

    /// Allocates a buffer able to hold `size` bytes.
    ///
    /// ## Errors
    /// * [`GpuError::BufferTooLarge`] - exceeds `max_buffer_size`.
    /// * [`GpuError::Api`] - the device rejected the allocation.
    pub fn create(context: &GpuContext, size: u64, role: BufferRole) -> GpuResult<Self> {
        let allocated = Self::allocation_size(size);
        let limit = context.limits().max_buffer_size;
        if allocated > limit {
            return Err(GpuError::BufferTooLarge { size: allocated, limit });
        }

        let buffer = context.scoped("create_buffer", |device| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(role.label()),
                size: allocated,
                usage: Self::USAGE,
                mapped_at_creation: false,
            })
        })?;

        debug!(?role, requested = size, allocated, "buffer allocated");
        Ok(Self { buffer, requested: size, role })
    }

    /// Allocates an input buffer and uploads `bytes` into it.
    pub fn with_contents(context: &GpuContext, bytes: &[u8]) -> GpuResult<Self> {
        let buffer = Self::create(context, bytes.len() as u64, BufferRole::Input)?;
        buffer.upload(context, bytes)?;
        Ok(buffer)
    }

    /// Requested size in bytes.
    pub fn len(&self) -> u64 {
        self.requested
    }

    /// Returns `true` for a zero-byte request.
    pub fn is_empty(&self) -> bool {
        self.requested == 0
    }

    /// Allocated size in bytes (`>= len()`).
    pub fn allocated(&self) -> u64 {
        self.buffer.size()
    }

    /// Role the buffer was created for.
    pub fn role(&self) -> BufferRole {
        self.role
    }

    /// Underlying wgpu buffer.
    pub(crate) fn raw(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Copies `bytes` into the buffer through a host mapping.
    pub fn upload(&self, context: &GpuContext, bytes: &[u8]) -> GpuResult<()> {
        self.check_host_len(bytes.len())?;
        if bytes.is_empty() {
            return Ok(());
        }

        let slice = self.buffer.slice(..);
        self.map(context, slice, wgpu::MapMode::Write)?;
        {
            let mut view = slice.get_mapped_range_mut();
            view[..bytes.len()].copy_from_slice(bytes);
        }
        self.buffer.unmap();
        Ok(())
    }

    /// Copies the buffer's contents into `out` through a host mapping.
    ///
    /// The caller must have waited for every submission writing this buffer.
    pub fn download(&self, context: &GpuContext, out: &mut [u8]) -> GpuResult<()> {
        self.check_host_len(out.len())?;
        if out.is_empty() {
            return Ok(());
        }

        let slice = self.buffer.slice(..);
        self.map(context, slice, wgpu::MapMode::Read)?;
        {
            let view = slice.get_mapped_range();
            out.copy_from_slice(&view[..out.len()]);
        }
        self.buffer.unmap();
        Ok(())
    }

    /// Downloads the buffer into a freshly allocated vector.
    pub fn to_vec(&self, context: &GpuContext) -> GpuResult<Vec<u8>> {
        let mut out = vec![0u8; self.requested as usize];
        self.download(context, &mut out)?;
        Ok(out)
    }

    fn check_host_len(&self, actual: usize) -> GpuResult<()> {
        if actual as u64 != self.requested {
            return Err(GpuError::HostLengthMismatch {
                expected: self.requested,
                actual,
            });
        }
        Ok(())
    }

    fn map(&self, context: &GpuContext, slice: wgpu::BufferSlice<'_>, mode: wgpu::MapMode) -> GpuResult<()> {
        let (tx, rx) = mpsc::channel();
        slice.map_async(mode, move |result| {
            let _ = tx.send(result);
        });
        context.wait_idle()?;

        rx.recv()
            .map_err(|e| GpuError::api("map_async", e))?
            .map_err(|e| GpuError::api("map_async", e))
    }
}

impl Drop for DeviceBuffer {
    fn drop(&mut self) {
        self.buffer.destroy();
    }
}
