//! Data layouts shared between wavetrace's kernels and the host.
//!
//! Every type in here is `#[repr(C)]` and mirrors a struct declared in the
//! WGSL sources of `wavetrace-shaders`; changing a field here without
//! changing the kernel (or vice versa) silently corrupts the frame.

mod hit;
mod params;
mod ray;
mod scene;
mod workgroups;

pub use self::hit::*;
pub use self::params::*;
pub use self::ray::*;
pub use self::scene::*;
pub use self::workgroups::*;

/// Number of invocations per workgroup, shared by every compute kernel.
pub const WORKGROUP_SIZE: u32 = 256;

/// Maximum number of workgroups along a single dispatch dimension.
pub const MAX_WORKGROUPS_PER_DIMENSION: u32 = 65535;

/// Number of key bits consumed by one radix-sort pass.
pub const RADIX_BITS: u32 = 2;

/// Number of distinct digits per radix-sort pass (`2 ^ RADIX_BITS`).
pub const RADIX_BUCKETS: u32 = 1 << RADIX_BITS;

/// Width of the material sort key.
pub const RADIX_KEY_BITS: u32 = 16;

/// Number of radix-sort passes needed to cover the whole key.
pub const RADIX_PASSES: u32 = RADIX_KEY_BITS / RADIX_BITS;

/// Sort key given to dead and padded slots, so that they end up behind every
/// live ray.
pub const DEAD_KEY: u32 = (1 << RADIX_KEY_BITS) - 1;

/// Material index stored in a [`Hit`] when the ray escaped the scene.
pub const MISS: u32 = u32::MAX;
