use std::cell::RefCell;
use std::fmt;
use std::time::Instant;

use derivative::Derivative;
use log::{debug, info};

use crate::utils::yield_now;
use crate::{
    compaction, gpu, radix, BufferPool, Device, Frame, Generation,
    GenerationCounter, Kernel, Progress, RenderConfig, RenderMode,
    RenderStatus, Result, Scene,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    Completed { samples: u32 },

    /// A newer render started before this one finished; nothing has been
    /// reported on its behalf since.
    Cancelled,
}

pub type StatusCallback = Box<dyn Fn(RenderStatus)>;

/// Frame orchestrator: schedules kernel dispatches, owns the working buffers
/// and cancels renders superseded by newer ones.
///
/// Renders run on `&self`, so a new one can be started while a previous one
/// is still suspended waiting for the device; the previous one notices at its
/// next suspension point and bails out.
#[derive(Derivative)]
#[derivative(Debug(bound = "D: fmt::Debug, D::Buffer: fmt::Debug"))]
pub struct Renderer<D>
where
    D: Device,
{
    device: D,
    triangle_count: u32,
    box_count: u32,
    pool: RefCell<BufferPool<D::Buffer>>,
    generations: GenerationCounter,
    progress: RefCell<Progress>,

    #[derivative(Debug = "ignore")]
    on_status: Option<StatusCallback>,
}

impl<D> Renderer<D>
where
    D: Device,
{
    pub fn new(device: D, scene: &Scene) -> Result<Self> {
        info!(
            "Uploading scene; triangles={}, materials={}, bounding_boxes={}",
            scene.triangles().len(),
            scene.materials().len(),
            scene.bounding_boxes().len(),
        );

        device.upload_scene(scene)?;

        Ok(Self {
            device,
            triangle_count: scene.triangles().len() as u32,
            box_count: scene.bounding_boxes().len() as u32,
            pool: Default::default(),
            generations: GenerationCounter::new(),
            progress: Default::default(),
            on_status: None,
        })
    }

    pub fn with_status_callback(
        mut self,
        callback: impl Fn(RenderStatus) + 'static,
    ) -> Self {
        self.on_status = Some(Box::new(callback));
        self
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn generations(&self) -> &GenerationCounter {
        &self.generations
    }

    pub fn progress(&self) -> Progress {
        *self.progress.borrow()
    }

    /// Renders the scene at given resolution, accumulating
    /// `config.target_samples()` samples per pixel into the output
    /// accumulator.
    ///
    /// Starting a render supersedes every render still in flight.
    pub async fn render(
        &self,
        width: u32,
        height: u32,
        config: &RenderConfig,
    ) -> Result<RenderOutcome> {
        assert!(
            width > 0 && height > 0,
            "can't render an empty image ({width}x{height})"
        );

        let pixel_count = width
            .checked_mul(height)
            .filter(|&count| count <= 1 << 31)
            .unwrap_or_else(|| panic!("{width}x{height} is too large"));

        let samples = config.target_samples();

        assert!(samples > 0, "render needs at least one sample");

        let generation = self.generations.advance();

        info!(
            "Rendering #{}; size={width}x{height}, mode={:?}, samples={}",
            generation.id(),
            config.mode,
            samples,
        );

        self.pool.borrow_mut().ensure(&self.device, pixel_count)?;

        let params = self.frame_params(width, height, config);

        self.device.write_params(0, bytemuck::bytes_of(&params));
        self.device.clear_output();
        self.progress.borrow_mut().reset();
        self.notify(RenderStatus::Rendering);

        yield_now().await;

        if !generation.is_current() {
            return Ok(self.cancelled(&generation));
        }

        self.progress.borrow_mut().reset();

        let started = Instant::now();

        let completed = match config.mode {
            RenderMode::AllSamplesAtOnce => {
                self.render_all_at_once(
                    &generation,
                    pixel_count,
                    samples,
                    started,
                )
                .await?
            }

            RenderMode::PerSample => {
                self.render_per_sample(
                    &generation,
                    pixel_count,
                    samples,
                    started,
                )
                .await?
            }

            RenderMode::PerSampleCoherent => {
                self.render_per_sample_coherent(
                    &generation,
                    pixel_count,
                    samples,
                    config.max_bounces,
                    started,
                )
                .await?
            }
        };

        if !completed {
            return Ok(self.cancelled(&generation));
        }

        let progress = self.progress();

        info!(
            "Render #{} done; samples={}, elapsed={}",
            generation.id(),
            progress.samples(),
            humantime::format_duration(progress.elapsed()),
        );

        self.notify(RenderStatus::Done);

        Ok(RenderOutcome::Completed {
            samples: progress.samples(),
        })
    }

    /// Copies the output accumulator back to the host; it holds the sum of
    /// every sample rendered so far.
    pub async fn read_output(&self) -> Result<Vec<[f32; 4]>> {
        self.device.read_output().await
    }

    async fn render_all_at_once(
        &self,
        generation: &Generation,
        pixel_count: u32,
        samples: u32,
        started: Instant,
    ) -> Result<bool> {
        let mut frame = Frame::new(&self.device);

        frame.write(gpu::FrameParams::SAMPLE_INDEX, &0u32);
        frame.dispatch(Kernel::RenderFull, pixel_count);

        // Presentation divides the accumulator by `sample_index + 1`
        frame.write(gpu::FrameParams::SAMPLE_INDEX, &(samples - 1));

        self.finish_batch(generation, samples, started).await
    }

    async fn render_per_sample(
        &self,
        generation: &Generation,
        pixel_count: u32,
        samples: u32,
        started: Instant,
    ) -> Result<bool> {
        let mut frame = Frame::new(&self.device);

        for sample in 0..samples {
            frame.begin_sample();
            frame.write(gpu::FrameParams::SAMPLE_INDEX, &sample);
            frame.dispatch(Kernel::RenderSample, pixel_count);

            if !self.finish_batch(generation, 1, started).await? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    async fn render_per_sample_coherent(
        &self,
        generation: &Generation,
        pixel_count: u32,
        samples: u32,
        max_bounces: u32,
        started: Instant,
    ) -> Result<bool> {
        let slot_count = pixel_count.next_power_of_two();
        let mut frame = Frame::new(&self.device);

        for sample in 0..samples {
            frame.begin_sample();
            frame.write(gpu::FrameParams::SAMPLE_INDEX, &sample);
            frame.dispatch(Kernel::BeginPass, slot_count);

            for _ in 0..max_bounces {
                frame.dispatch(Kernel::Intersect, slot_count);
                radix::run(&mut frame, slot_count);
                frame.dispatch(Kernel::Shade, slot_count);
                compaction::run(&mut frame, slot_count);
            }

            frame.dispatch(Kernel::FinishPass, slot_count);

            if !self.finish_batch(generation, 1, started).await? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Presents, waits for the device to catch up and - unless the render
    /// got superseded in the meantime - accounts for the finished samples.
    async fn finish_batch(
        &self,
        generation: &Generation,
        samples: u32,
        started: Instant,
    ) -> Result<bool> {
        self.device.present();
        self.device.on_submitted_work_done().await?;

        if !generation.is_current() {
            return Ok(false);
        }

        self.progress
            .borrow_mut()
            .record(samples, started.elapsed());

        Ok(true)
    }

    fn frame_params(
        &self,
        width: u32,
        height: u32,
        config: &RenderConfig,
    ) -> gpu::FrameParams {
        gpu::FrameParams {
            width,
            height,
            sample_index: 0,
            supersample_rate: config.supersample_rate,
            samples_per_grid_cell: config.samples_per_grid_cell,
            max_bounces: config.max_bounces,
            dof_radius: config.dof_radius,
            dof_distance: config.dof_distance,
            camera: config.orbit.matrix().to_cols_array_2d(),
            use_bounding_boxes: config.use_bounding_boxes as u32,
            triangle_count: self.triangle_count,
            box_count: self.box_count,
            slot_count: (width * height).next_power_of_two(),
            ..Default::default()
        }
    }

    fn cancelled(&self, generation: &Generation) -> RenderOutcome {
        debug!("Render #{} superseded; abandoning it", generation.id());

        RenderOutcome::Cancelled
    }

    fn notify(&self, status: RenderStatus) {
        debug!("Status: {status}");

        if let Some(on_status) = &self.on_status {
            on_status(status);
        }
    }
}

impl<D> Drop for Renderer<D>
where
    D: Device,
{
    fn drop(&mut self) {
        self.pool.get_mut().release(&self.device);
    }
}
