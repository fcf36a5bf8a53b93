use bytemuck::Pod;
use log::trace;

use crate::{gpu, BufferRoles, Device, Kernel};

/// Records commands of a single sample and checks that every transient
/// buffer a kernel reads has been produced by an earlier kernel of the same
/// sample.
///
/// The device executes commands in submission order and nothing else
/// synchronizes dependent kernels, so this is what keeps producers ahead of
/// their consumers.
pub struct Frame<'a, D> {
    device: &'a D,
    produced: BufferRoles,
}

impl<'a, D> Frame<'a, D>
where
    D: Device,
{
    pub fn new(device: &'a D) -> Self {
        Self {
            device,
            produced: Default::default(),
        }
    }

    /// Forgets everything produced so far; transient buffers don't carry
    /// anything over between samples.
    pub fn begin_sample(&mut self) {
        self.produced = Default::default();
    }

    pub fn write<T>(&mut self, offset: u64, value: &T)
    where
        T: Pod,
    {
        self.device.write_params(offset, bytemuck::bytes_of(value));
    }

    /// Dispatches `kernel` over `threads` invocations.
    pub fn dispatch(&mut self, kernel: Kernel, threads: u32) {
        for &role in kernel.reads() {
            debug_assert!(
                !role.is_transient() || self.produced.contains(role),
                "{kernel:?} reads `{role}` before anything produced it",
            );
        }

        for &role in kernel.writes() {
            self.produced.insert(role);
        }

        let workgroups = gpu::Workgroups::for_threads(threads);

        trace!("Dispatching {kernel:?}; threads={threads}, {workgroups:?}");

        self.device.dispatch(kernel, workgroups);
    }

    /// Treats given buffers as already produced, for exercising a single
    /// stage in isolation.
    #[cfg(test)]
    pub fn assume_produced(&mut self, roles: &[crate::BufferRole]) {
        for &role in roles {
            self.produced.insert(role);
        }
    }
}
