//! WGSL sources of the kernels driven by `wavetrace`.
//!
//! Every module is prefixed with `common.wgsl`, which carries the data
//! layouts shared with `wavetrace-gpu`.

/// Monolithic renderers plus the staged (wavefront) tracing kernels.
pub const TRACING: &str =
    concat!(include_str!("common.wgsl"), include_str!("tracing.wgsl"));

/// Scan engine, stream compaction and material radix sort.
pub const SORTING: &str =
    concat!(include_str!("common.wgsl"), include_str!("sorting.wgsl"));

/// Full-screen draw of the output accumulator.
pub const PRESENT: &str =
    concat!(include_str!("common.wgsl"), include_str!("present.wgsl"));

pub const PRESENT_VERTEX: &str = "vs_main";
pub const PRESENT_FRAGMENT: &str = "fs_main";
