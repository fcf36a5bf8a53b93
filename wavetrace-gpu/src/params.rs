use std::mem;

use bytemuck::{Pod, Zeroable};

/// Uniform block read by every kernel.
///
/// The first 108 bytes follow a fixed byte-offset contract; the trailing
/// fields extend it with values the kernels would otherwise have to derive
/// from buffer lengths.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct FrameParams {
    pub width: u32,
    pub height: u32,
    pub sample_index: u32,
    pub supersample_rate: u32,
    pub samples_per_grid_cell: u32,
    pub max_bounces: u32,
    pub dof_radius: f32,
    pub dof_distance: f32,

    /// Camera-to-world transform, column-major.
    pub camera: [[f32; 4]; 4],

    /// Current scan step; always a power of two.
    pub scan_step: u32,

    /// Current radix digit shift (0, 2, ..., 14).
    pub radix_shift: u32,

    pub use_bounding_boxes: u32,

    /// Length of the array the current scan runs over.
    pub scan_len: u32,

    pub triangle_count: u32,
    pub box_count: u32,

    /// Power-of-two ceiling of `width * height`.
    pub slot_count: u32,

    pub _pad: u32,
}

impl FrameParams {
    pub const SAMPLE_INDEX: u64 =
        mem::offset_of!(FrameParams, sample_index) as u64;

    pub const SCAN_STEP: u64 = mem::offset_of!(FrameParams, scan_step) as u64;

    pub const RADIX_SHIFT: u64 =
        mem::offset_of!(FrameParams, radix_shift) as u64;

    pub const SCAN_LEN: u64 = mem::offset_of!(FrameParams, scan_len) as u64;
}
