use log::{debug, info};

use crate::{Device, Result, WorkingBuffers};

/// Owns the per-resolution working buffers.
///
/// Holds at most one generation at a time: the previous one is destroyed
/// before the next one gets allocated, and a failed allocation leaves the
/// pool empty rather than half-built.
#[derive(Debug)]
pub struct BufferPool<B> {
    current: Option<WorkingBuffers<B>>,
}

impl<B> BufferPool<B> {
    pub fn new() -> Self {
        Self { current: None }
    }

    /// Makes sure the pool holds buffers for given pixel count, rebinding
    /// the device if they had to be reallocated; returns whether that
    /// happened.
    pub fn ensure<D>(&mut self, device: &D, pixel_count: u32) -> Result<bool>
    where
        D: Device<Buffer = B>,
    {
        if let Some(current) = &self.current {
            if current.pixel_count() == pixel_count {
                debug!("Reusing buffers; pixel_count={pixel_count}");
                return Ok(false);
            }
        }

        if let Some(previous) = self.current.take() {
            info!(
                "Destroying buffers; pixel_count={}",
                previous.pixel_count()
            );

            device.unbind();
            previous.destroy(device);
        }

        info!(
            "Allocating buffers; pixel_count={pixel_count}, slot_count={}",
            pixel_count.next_power_of_two()
        );

        let buffers = WorkingBuffers::allocate(device, pixel_count)?;

        device.bind(&buffers);
        self.current = Some(buffers);

        Ok(true)
    }

    #[cfg(test)]
    pub fn current(&self) -> Option<&WorkingBuffers<B>> {
        self.current.as_ref()
    }

    pub fn release<D>(&mut self, device: &D)
    where
        D: Device<Buffer = B>,
    {
        if let Some(current) = self.current.take() {
            device.unbind();
            current.destroy(device);
        }
    }
}

impl<B> Default for BufferPool<B> {
    fn default() -> Self {
        Self::new()
    }
}
