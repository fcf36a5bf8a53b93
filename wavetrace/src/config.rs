use glam::{Mat4, Vec3};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderMode {
    /// One dispatch traces every sample and every bounce; progress is
    /// reported once, when the whole frame is done.
    AllSamplesAtOnce,

    /// One dispatch per sample, each looping over all bounces internally.
    #[default]
    PerSample,

    /// One sample at a time, with every bounce staged explicitly: rays are
    /// sorted by material before shading and compacted afterwards.
    PerSampleCoherent,
}

/// Camera orbiting the origin, looking at it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Orbit {
    pub radius: f32,

    /// Radians; positive values look down at the scene.
    pub latitude: f32,

    /// Radians, around the Y axis.
    pub longitude: f32,
}

impl Orbit {
    pub fn eye(&self) -> Vec3 {
        let (lat_sin, lat_cos) = self.latitude.sin_cos();
        let (lon_sin, lon_cos) = self.longitude.sin_cos();

        self.radius * Vec3::new(lat_cos * lon_sin, lat_sin, lat_cos * lon_cos)
    }

    /// Camera-to-world transform; the camera looks down its -Z axis.
    pub fn matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), Vec3::ZERO, Vec3::Y).inverse()
    }
}

impl Default for Orbit {
    fn default() -> Self {
        Self {
            radius: 4.0,
            latitude: 0.0,
            longitude: 0.0,
        }
    }
}

/// Snapshot of everything a render reads from the outside world; taken once,
/// at frame start.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderConfig {
    pub mode: RenderMode,
    pub supersample_rate: u32,
    pub samples_per_grid_cell: u32,
    pub max_bounces: u32,
    pub dof_radius: f32,
    pub dof_distance: f32,
    pub orbit: Orbit,
    pub use_bounding_boxes: bool,
}

impl RenderConfig {
    /// Number of samples a completed render accumulates per pixel.
    pub fn target_samples(&self) -> u32 {
        let rate = self.supersample_rate;

        rate * rate * self.samples_per_grid_cell
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            mode: Default::default(),
            supersample_rate: 4,
            samples_per_grid_cell: 1,
            max_bounces: 4,
            dof_radius: 0.0,
            dof_distance: 4.0,
            orbit: Default::default(),
            use_bounding_boxes: false,
        }
    }
}
