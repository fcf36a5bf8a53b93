use std::cell::RefCell;
use std::future::Future;
use std::sync::{Arc, Mutex};

use futures::channel::oneshot;
use fxhash::FxHashMap;
use log::{error, info};

use crate::utils::yield_now;
use crate::{
    gpu, BufferRole, BufferSpec, ComputePass, Device, Kernel, KernelModule,
    PresentPass, RenderError, Result, Scene, StorageBuffer, UniformBuffer,
    WorkingBuffers,
};

/// [`Device`] backed by `wgpu`.
///
/// Commands are recorded into a single pending encoder which gets submitted
/// whenever ordering against queue writes requires it (i.e. before every
/// parameter write) and when the renderer waits for the device.
#[derive(Debug)]
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    tracing: wgpu::ShaderModule,
    sorting: wgpu::ShaderModule,
    present: wgpu::ShaderModule,
    params: UniformBuffer<gpu::FrameParams>,
    scene: RefCell<Option<SceneBuffers>>,
    bound: RefCell<Option<BoundBuffers>>,
    target: RefCell<Option<PresentTarget>>,
    encoder: RefCell<Option<wgpu::CommandEncoder>>,
    failure: Arc<Mutex<Option<String>>>,
}

#[derive(Debug)]
struct SceneBuffers {
    triangles: StorageBuffer,
    materials: StorageBuffer,
    bounding_boxes: StorageBuffer,
}

#[derive(Debug)]
struct BoundBuffers {
    pixel_count: u32,
    output: StorageBuffer,
    passes: FxHashMap<Kernel, ComputePass>,
    present: Option<PresentPass>,
}

#[derive(Debug)]
struct PresentTarget {
    view: wgpu::TextureView,
    format: wgpu::TextureFormat,
}

impl WgpuDevice {
    /// Picks the default high-performance adapter and opens a device on it,
    /// without any surface.
    pub async fn request() -> Result<Self> {
        let instance =
            wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await
            .ok_or(RenderError::AdapterNotFound)?;

        info!("Using adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("wavetrace"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter.limits(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await?;

        Ok(Self::new(device, queue))
    }

    /// Wraps a device the caller already owns; kernels get compiled here.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let failure = Arc::new(Mutex::new(None));

        device.on_uncaptured_error(Box::new({
            let failure = Arc::clone(&failure);

            move |err| {
                error!("Device error: {err}");

                if let Ok(mut failure) = failure.lock() {
                    failure.get_or_insert_with(|| err.to_string());
                }
            }
        }));

        let shader = |label: &str, source: &'static str| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        };

        let tracing = shader("wavetrace_tracing", wavetrace_shaders::TRACING);
        let sorting = shader("wavetrace_sorting", wavetrace_shaders::SORTING);
        let present = shader("wavetrace_present", wavetrace_shaders::PRESENT);
        let params = UniformBuffer::new(&device, "wavetrace_params");

        Self {
            device,
            queue,
            tracing,
            sorting,
            present,
            params,
            scene: Default::default(),
            bound: Default::default(),
            target: Default::default(),
            encoder: Default::default(),
            failure,
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Sets the texture [`Device::present()`] draws onto; without one,
    /// presenting is a no-op.
    pub fn set_present_target(
        &self,
        view: wgpu::TextureView,
        format: wgpu::TextureFormat,
    ) {
        let format_changed = self
            .target
            .borrow()
            .as_ref()
            .map_or(true, |target| target.format != format);

        *self.target.borrow_mut() = Some(PresentTarget { view, format });

        if format_changed {
            if let Some(bound) = self.bound.borrow_mut().as_mut() {
                bound.present = Some(self.present_pass(format, &bound.output));
            }
        }
    }

    fn present_pass(
        &self,
        format: wgpu::TextureFormat,
        output: &StorageBuffer,
    ) -> PresentPass {
        PresentPass::new(
            &self.device,
            &self.present,
            format,
            &self.params,
            output,
        )
    }

    fn with_encoder(&self, f: impl FnOnce(&mut wgpu::CommandEncoder)) {
        let mut encoder = self.encoder.borrow_mut();

        let encoder = encoder.get_or_insert_with(|| {
            self.device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("wavetrace_commands"),
                })
        });

        f(encoder);
    }

    fn check_failure(&self) -> Result<()> {
        let failure = self
            .failure
            .lock()
            .map_err(|_| {
                RenderError::Device("error handler panicked".into())
            })?
            .take();

        match failure {
            Some(reason) => Err(RenderError::Device(reason)),
            None => Ok(()),
        }
    }
}

impl Device for WgpuDevice {
    type Buffer = StorageBuffer;

    fn upload_scene(&self, scene: &Scene) -> Result<()> {
        let upload = |role, data: &[u8]| {
            StorageBuffer::with_data(&self.device, &self.queue, role, data)
        };

        let buffers = SceneBuffers {
            triangles: upload(
                BufferRole::Triangles,
                bytemuck::cast_slice(scene.triangles()),
            )?,
            materials: upload(
                BufferRole::Materials,
                bytemuck::cast_slice(scene.materials()),
            )?,
            bounding_boxes: upload(
                BufferRole::BoundingBoxes,
                bytemuck::cast_slice(scene.bounding_boxes()),
            )?,
        };

        if let Some(prev) = self.scene.borrow_mut().replace(buffers) {
            prev.triangles.destroy();
            prev.materials.destroy();
            prev.bounding_boxes.destroy();
        }

        self.check_failure()
    }

    fn create_buffer(&self, spec: BufferSpec) -> Result<StorageBuffer> {
        StorageBuffer::new(&self.device, spec.role, spec.size)
    }

    fn destroy_buffer(&self, buffer: StorageBuffer) {
        // Commands already recorded against the buffer must reach the queue
        // first; wgpu defers the actual release until they're done.
        self.submit();
        buffer.destroy();
    }

    fn bind(&self, buffers: &WorkingBuffers<StorageBuffer>) {
        let scene = self.scene.borrow();

        let Some(scene) = scene.as_ref() else {
            panic!("scene must be uploaded before binding working buffers");
        };

        let buf = |role| buffers.get(role);

        let passes = Kernel::ALL
            .into_iter()
            .map(|kernel| {
                let label = kernel.entry_point();

                let pass = match kernel.module() {
                    KernelModule::Tracing => ComputePass::builder(label)
                        .bind([
                            &self.params,
                            &scene.triangles.as_ro_bind(),
                            &scene.materials.as_ro_bind(),
                            &scene.bounding_boxes.as_ro_bind(),
                            &buf(BufferRole::Rays).as_rw_bind(),
                            &buf(BufferRole::Hits).as_rw_bind(),
                            &buf(BufferRole::Radiance).as_rw_bind(),
                            &buf(BufferRole::Output).as_rw_bind(),
                            &buf(BufferRole::State).as_rw_bind(),
                        ])
                        .build(&self.device, (&self.tracing, label)),

                    KernelModule::Sorting => ComputePass::builder(label)
                        .bind([
                            &self.params,
                            &buf(BufferRole::Rays).as_rw_bind(),
                            &buf(BufferRole::Hits).as_rw_bind(),
                            &buf(BufferRole::Flags).as_rw_bind(),
                            &buf(BufferRole::Scan).as_rw_bind(),
                            &buf(BufferRole::RayScratch).as_rw_bind(),
                            &buf(BufferRole::HitScratch).as_rw_bind(),
                            &buf(BufferRole::State).as_rw_bind(),
                        ])
                        .build(&self.device, (&self.sorting, label)),
                };

                (kernel, pass)
            })
            .collect();

        let output = buf(BufferRole::Output).clone();

        let present = self
            .target
            .borrow()
            .as_ref()
            .map(|target| self.present_pass(target.format, &output));

        *self.bound.borrow_mut() = Some(BoundBuffers {
            pixel_count: buffers.pixel_count(),
            output,
            passes,
            present,
        });
    }

    fn unbind(&self) {
        *self.bound.borrow_mut() = None;
    }

    fn write_params(&self, offset: u64, bytes: &[u8]) {
        // Queue writes land before the next submission, so whatever got
        // recorded under the previous values has to go out first.
        self.submit();
        self.params.write(&self.queue, offset, bytes);
    }

    fn clear_output(&self) {
        let bound = self.bound.borrow();

        let Some(bound) = bound.as_ref() else {
            panic!("no working buffers are bound");
        };

        self.with_encoder(|encoder| {
            encoder.clear_buffer(bound.output.raw(), 0, None);
        });
    }

    fn dispatch(&self, kernel: Kernel, workgroups: gpu::Workgroups) {
        let bound = self.bound.borrow();

        let Some(pass) = bound.as_ref().and_then(|b| b.passes.get(&kernel))
        else {
            panic!("no working buffers are bound");
        };

        self.with_encoder(|encoder| {
            pass.run(encoder, workgroups);
        });
    }

    fn present(&self) {
        let bound = self.bound.borrow();
        let target = self.target.borrow();

        if let (Some(pass), Some(target)) = (
            bound.as_ref().and_then(|bound| bound.present.as_ref()),
            target.as_ref(),
        ) {
            self.with_encoder(|encoder| {
                pass.run(encoder, &target.view);
            });
        }
    }

    fn submit(&self) {
        let encoder = self.encoder.borrow_mut().take();

        if let Some(encoder) = encoder {
            self.queue.submit([encoder.finish()]);
        }
    }

    fn on_submitted_work_done(&self) -> impl Future<Output = Result<()>> {
        self.submit();

        let (tx, mut rx) = oneshot::channel();

        self.queue.on_submitted_work_done(move || {
            _ = tx.send(());
        });

        async move {
            // Poll once and give other tasks a single chance to run (e.g. a
            // newer render superseding this one); after that, block until
            // the queue drains.
            let mut yielded = false;

            loop {
                let maintain = if yielded {
                    wgpu::Maintain::Wait
                } else {
                    wgpu::Maintain::Poll
                };

                _ = self.device.poll(maintain);
                self.check_failure()?;

                match rx.try_recv() {
                    Ok(Some(())) => return Ok(()),

                    Ok(None) => {
                        yielded = true;
                        yield_now().await;
                    }

                    Err(_) => {
                        return Err(RenderError::Device(
                            "device was lost".into(),
                        ));
                    }
                }
            }
        }
    }

    fn read_output(&self) -> impl Future<Output = Result<Vec<[f32; 4]>>> {
        async move {
            let Some((output, pixel_count)) = self
                .bound
                .borrow()
                .as_ref()
                .map(|bound| (bound.output.clone(), bound.pixel_count))
            else {
                return Ok(Vec::new());
            };

            let size = pixel_count as u64 * 16;

            let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("wavetrace_output_staging"),
                size,
                usage: wgpu::BufferUsages::MAP_READ
                    | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });

            self.with_encoder(|encoder| {
                encoder.copy_buffer_to_buffer(
                    output.raw(),
                    0,
                    &staging,
                    0,
                    size,
                );
            });

            self.submit();

            let (tx, rx) = oneshot::channel();

            staging.slice(..).map_async(wgpu::MapMode::Read, move |result| {
                _ = tx.send(result);
            });

            _ = self.device.poll(wgpu::Maintain::Wait);

            rx.await
                .map_err(|_| RenderError::Device("device was lost".into()))?
                .map_err(|err| RenderError::Device(err.to_string()))?;

            self.check_failure()?;

            let pixels = staging
                .slice(..)
                .get_mapped_range()
                .chunks_exact(16)
                .map(bytemuck::pod_read_unaligned)
                .collect();

            staging.unmap();
            staging.destroy();

            Ok(pixels)
        }
    }
}
