//! Work-efficient exclusive prefix sum (Blelloch) over the `scan` buffer.

use log::trace;

use crate::{gpu, Device, Frame, Kernel};

/// Replaces `scan[0..len]` with its exclusive prefix sum.
///
/// Takes `2 * log2(len) + 1` dispatches; every round consumes the previous
/// round's output, so each one is preceded by its own step write.
pub fn run<D>(frame: &mut Frame<'_, D>, len: u32)
where
    D: Device,
{
    assert!(
        len.is_power_of_two(),
        "scan length must be a power of two, got {len}"
    );

    trace!("Scanning; len={len}");

    frame.write(gpu::FrameParams::SCAN_LEN, &len);

    let mut step = 2;

    while step <= len {
        frame.write(gpu::FrameParams::SCAN_STEP, &step);
        frame.dispatch(Kernel::ScanUpsweep, len / step);
        step *= 2;
    }

    // The root now holds the total; zeroing it turns the reduction tree into
    // the seed of an exclusive scan.
    frame.dispatch(Kernel::ScanClearRoot, 1);

    let mut step = len;

    while step >= 2 {
        frame.write(gpu::FrameParams::SCAN_STEP, &step);
        frame.dispatch(Kernel::ScanDownsweep, len / step);
        step /= 2;
    }
}
