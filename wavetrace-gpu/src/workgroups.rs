use crate::{MAX_WORKGROUPS_PER_DIMENSION, WORKGROUP_SIZE};

/// Dispatch size of a compute kernel.
///
/// Dispatches are one-dimensional (`ceil(threads / WORKGROUP_SIZE)`) until
/// they'd exceed [`MAX_WORKGROUPS_PER_DIMENSION`]; past that they're folded
/// into a 2D grid and kernels rebuild the linear invocation id as
/// `gid.y * (x * WORKGROUP_SIZE) + gid.x`, gating on the thread count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Workgroups {
    pub x: u32,
    pub y: u32,
}

impl Workgroups {
    pub fn for_threads(threads: u32) -> Self {
        let groups = threads.div_ceil(WORKGROUP_SIZE).max(1);

        if groups <= MAX_WORKGROUPS_PER_DIMENSION {
            Self { x: groups, y: 1 }
        } else {
            let y = groups.div_ceil(MAX_WORKGROUPS_PER_DIMENSION);

            Self {
                x: groups.div_ceil(y),
                y,
            }
        }
    }

    pub fn count(&self) -> u32 {
        self.x * self.y
    }

    /// Number of invocations this dispatch spawns; at least the number of
    /// threads it was created for.
    pub fn invocations(&self) -> u64 {
        self.count() as u64 * WORKGROUP_SIZE as u64
    }
}
