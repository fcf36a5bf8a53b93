//! Stream compaction: squeezes terminated rays out of the active set.
//!
//! Live rays (and their hits) end up packed at the front of the working
//! buffers, in their original relative order. The new active count is
//! computed on the device (as the last prefix sum plus the last flag) and
//! stays there; dispatch sizes keep using the padded slot count and kernels
//! gate on the device-side count instead.

use crate::{scan, Device, Frame, Kernel};

pub fn run<D>(frame: &mut Frame<'_, D>, slot_count: u32)
where
    D: Device,
{
    frame.dispatch(Kernel::CompactMark, slot_count);
    scan::run(frame, slot_count);
    frame.dispatch(Kernel::CompactScatter, slot_count);
    frame.dispatch(Kernel::CompactCopyBack, slot_count);
}
