//! LSD radix sort of the active rays by the material they hit.
//!
//! Each pass sorts by one 2-bit digit: RadixCount writes a one-hot counter
//! per (digit, slot) laid out digit-major, the scan turns those into final
//! positions and RadixScatter moves the records there. Passes go from the
//! least to the most significant digit, each one stable, so the whole sort
//! is stable too. Slots past the active count carry [`gpu::DEAD_KEY`] and
//! never overtake a live ray.

use log::trace;

use crate::{gpu, scan, Device, Frame, Kernel};

pub fn run<D>(frame: &mut Frame<'_, D>, slot_count: u32)
where
    D: Device,
{
    for pass in 0..gpu::RADIX_PASSES {
        let shift = pass * gpu::RADIX_BITS;

        trace!("Radix pass #{pass}; shift={shift}");

        frame.write(gpu::FrameParams::RADIX_SHIFT, &shift);
        frame.dispatch(Kernel::RadixCount, slot_count);
        scan::run(frame, gpu::RADIX_BUCKETS * slot_count);
        frame.dispatch(Kernel::RadixScatter, slot_count);
        frame.dispatch(Kernel::RadixCopyBack, slot_count);
    }
}
