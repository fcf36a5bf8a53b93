use bytemuck::{Pod, Zeroable};

use crate::{DEAD_KEY, MISS};

/// Closest intersection found for the ray occupying the same slot.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Hit {
    pub normal: [f32; 3],
    pub distance: f32,

    /// Barycentric coordinates of the hit point (weights of `b` and `c`).
    pub uv: [f32; 2],

    /// Material index, or [`MISS`].
    pub material: u32,

    pub triangle: u32,
}

impl Hit {
    pub fn is_miss(&self) -> bool {
        self.material == MISS
    }

    /// Key used when sorting rays by material; misses sort last.
    pub fn sort_key(&self) -> u32 {
        self.material.min(DEAD_KEY)
    }
}

impl Default for Hit {
    fn default() -> Self {
        Self {
            normal: [0.0; 3],
            distance: f32::MAX,
            uv: [0.0; 2],
            material: MISS,
            triangle: 0,
        }
    }
}
