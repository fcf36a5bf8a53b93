use crate::gpu;

/// Flattened scene, as produced by a scene loader.
///
/// Uploaded once, when the renderer is created, and shared read-only by
/// every render afterwards.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    triangles: Vec<gpu::Triangle>,
    materials: Vec<gpu::Material>,
    bounding_boxes: Vec<gpu::BoundingBox>,
}

impl Scene {
    pub fn new(
        triangles: Vec<gpu::Triangle>,
        materials: Vec<gpu::Material>,
    ) -> Self {
        for triangle in &triangles {
            assert!(
                (triangle.material as usize) < materials.len(),
                "triangle refers to material #{}, but there are only {}",
                triangle.material,
                materials.len(),
            );
        }

        Self {
            triangles,
            materials,
            bounding_boxes: Vec::new(),
        }
    }

    /// Groups consecutive triangles into runs of `chunk` and wraps each run
    /// in a bounding box.
    pub fn with_chunked_bounding_boxes(mut self, chunk: usize) -> Self {
        assert!(chunk > 0);

        self.bounding_boxes = self
            .triangles
            .chunks(chunk)
            .enumerate()
            .map(|(idx, triangles)| {
                let mut bb = gpu::BoundingBox::empty((idx * chunk) as u32);

                for vertex in triangles.iter().flat_map(|tri| tri.vertices()) {
                    bb.grow(vertex);
                }

                bb
            })
            .collect();

        self
    }

    pub fn triangles(&self) -> &[gpu::Triangle] {
        &self.triangles
    }

    pub fn materials(&self) -> &[gpu::Material] {
        &self.materials
    }

    pub fn bounding_boxes(&self) -> &[gpu::BoundingBox] {
        &self.bounding_boxes
    }
}
