use std::sync::Arc;

use log::debug;

use crate::buffers::bindable::buffer_layout;
use crate::{Bindable, BufferRole, RenderError, Result};

/// Storage buffer that exists only in VRAM.
///
/// Kernels read and write it directly; the host only ever touches it through
/// queue writes, clears and copies.
#[derive(Clone, Debug)]
pub struct StorageBuffer {
    buffer: Arc<wgpu::Buffer>,
    role: BufferRole,
}

impl StorageBuffer {
    /// Allocates the buffer, reporting (rather than panicking on) sizes the
    /// device can't hold.
    pub fn new(
        device: &wgpu::Device,
        role: BufferRole,
        size: u64,
    ) -> Result<Self> {
        let label = format!("wavetrace_{role}");
        let size = pad_size(size);
        let limits = device.limits();

        debug!("Allocating storage buffer `{label}`; size={size}");

        let limit = limits
            .max_buffer_size
            .min(limits.max_storage_buffer_binding_size as u64);

        if size > limit {
            return Err(RenderError::Allocation {
                role,
                size,
                reason: format!("exceeds device limit of {limit} bytes"),
            });
        }

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&label),
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            size,
            mapped_at_creation: false,
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            buffer.destroy();

            return Err(RenderError::Allocation {
                role,
                size,
                reason: err.to_string(),
            });
        }

        Ok(Self {
            buffer: Arc::new(buffer),
            role,
        })
    }

    /// Allocates the buffer and fills it with `data`.
    pub fn with_data(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        role: BufferRole,
        data: &[u8],
    ) -> Result<Self> {
        let this = Self::new(device, role, data.len() as u64)?;

        if !data.is_empty() {
            queue.write_buffer(&this.buffer, 0, data);
        }

        Ok(this)
    }

    pub fn raw(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn destroy(&self) {
        debug!("Destroying storage buffer `wavetrace_{}`", self.role);

        self.buffer.destroy();
    }

    pub fn as_ro_bind(&self) -> impl Bindable + '_ {
        StorageBufferBinder {
            parent: self,
            read_only: true,
        }
    }

    pub fn as_rw_bind(&self) -> impl Bindable + '_ {
        StorageBufferBinder {
            parent: self,
            read_only: false,
        }
    }
}

pub struct StorageBufferBinder<'a> {
    parent: &'a StorageBuffer,
    read_only: bool,
}

impl Bindable for StorageBufferBinder<'_> {
    fn bind(
        &self,
        binding: u32,
    ) -> Vec<(wgpu::BindGroupLayoutEntry, wgpu::BindingResource)> {
        let layout = buffer_layout(
            binding,
            wgpu::BufferBindingType::Storage {
                read_only: self.read_only,
            },
        );

        let resource = self.parent.buffer.as_entire_binding();

        vec![(layout, resource)]
    }
}

/// Runtime-sized arrays need room for at least one element, even when the
/// scene has none (e.g. no bounding boxes); sizes are rounded up to whole
/// 16-byte rows.
fn pad_size(size: u64) -> u64 {
    size.max(MIN_SIZE).next_multiple_of(16)
}

const MIN_SIZE: u64 = 256;
