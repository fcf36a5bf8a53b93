use bytemuck::{Pod, Zeroable};

/// In-flight ray, one per active pixel-sample slot.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Ray {
    pub origin: [f32; 3],

    /// Index of the pixel this ray contributes to.
    pub pixel: u32,

    pub direction: [f32; 3],

    /// Non-zero while the ray keeps bouncing.
    pub alive: u32,

    pub throughput: [f32; 3],

    /// Per-ray random state.
    pub rng: u32,
}

impl Ray {
    pub fn is_alive(&self) -> bool {
        self.alive != 0
    }
}
