use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Triangle {
    pub a: [f32; 3],
    pub material: u32,
    pub b: [f32; 3],
    pub _pad0: u32,
    pub c: [f32; 3],
    pub _pad1: u32,
}

impl Triangle {
    pub fn new(a: [f32; 3], b: [f32; 3], c: [f32; 3], material: u32) -> Self {
        Self {
            a,
            material,
            b,
            c,
            ..Default::default()
        }
    }

    pub fn vertices(&self) -> [[f32; 3]; 3] {
        [self.a, self.b, self.c]
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Material {
    pub diffuse: [f32; 4],
    pub emissive: [f32; 3],

    /// Non-zero if rays hitting this material take part in coherence sorting
    /// statistics; kernels treat it as an opaque flag.
    pub coherent: u32,

    pub roughness: f32,
    pub _pad: [f32; 3],
}

impl Material {
    pub fn diffuse(color: [f32; 3]) -> Self {
        Self {
            diffuse: [color[0], color[1], color[2], 1.0],
            roughness: 1.0,
            ..Default::default()
        }
    }

    pub fn emissive(color: [f32; 3]) -> Self {
        Self {
            emissive: color,
            roughness: 1.0,
            ..Default::default()
        }
    }
}

/// Axis-aligned box enclosing a run of consecutive triangles, starting at
/// `first_triangle` and ending where the next box's run begins.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct BoundingBox {
    pub min: [f32; 3],
    pub _pad: u32,
    pub max: [f32; 3],
    pub first_triangle: u32,
}

impl BoundingBox {
    /// Box that contains nothing; growing it by any point yields a box
    /// around just that point.
    pub fn empty(first_triangle: u32) -> Self {
        Self {
            min: [f32::MAX; 3],
            _pad: 0,
            max: [f32::MIN; 3],
            first_triangle,
        }
    }

    pub fn grow(&mut self, point: [f32; 3]) {
        for axis in 0..3 {
            self.min[axis] = self.min[axis].min(point[axis]);
            self.max[axis] = self.max[axis].max(point[axis]);
        }
    }

    pub fn contains(&self, point: [f32; 3]) -> bool {
        (0..3).all(|axis| {
            point[axis] >= self.min[axis] && point[axis] <= self.max[axis]
        })
    }
}
