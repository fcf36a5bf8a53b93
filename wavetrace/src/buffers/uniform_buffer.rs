use std::marker::PhantomData;
use std::{any, mem};

use bytemuck::Pod;
use log::debug;

use crate::buffers::bindable::buffer_layout;
use crate::Bindable;

/// Uniform buffer written piecewise through the queue.
#[derive(Debug)]
pub struct UniformBuffer<T> {
    buffer: wgpu::Buffer,
    _marker: PhantomData<T>,
}

impl<T> UniformBuffer<T>
where
    T: Pod,
{
    pub fn new(device: &wgpu::Device, label: impl AsRef<str>) -> Self {
        let label = label.as_ref();
        let size = mem::size_of::<T>();
        let padded_size = (size + 31) & !31;

        debug!(
            "Allocating uniform buffer `{label}`; ty={}, size={padded_size}",
            any::type_name::<T>(),
        );

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::UNIFORM,
            size: padded_size as _,
            mapped_at_creation: false,
        });

        Self {
            buffer,
            _marker: PhantomData,
        }
    }

    /// Overwrites `bytes.len()` bytes starting at `offset`.
    pub fn write(&self, queue: &wgpu::Queue, offset: u64, bytes: &[u8]) {
        assert!(
            offset as usize + bytes.len() <= mem::size_of::<T>(),
            "write of {} bytes at {offset} doesn't fit in {}",
            bytes.len(),
            any::type_name::<T>(),
        );

        queue.write_buffer(&self.buffer, offset, bytes);
    }
}

impl<T> Bindable for UniformBuffer<T> {
    fn bind(
        &self,
        binding: u32,
    ) -> Vec<(wgpu::BindGroupLayoutEntry, wgpu::BindingResource)> {
        let layout = buffer_layout(binding, wgpu::BufferBindingType::Uniform);
        let resource = self.buffer.as_entire_binding();

        vec![(layout, resource)]
    }
}
