//! Host-side device for tests.
//!
//! Runs every kernel on the CPU with the same gating rules as the WGSL
//! sources: sorting kernels exactly, tracing kernels against a synthetic
//! scene in which a ray's fate depends only on its pixel, sample and bounce.
//! Every command is recorded, and allocations and waits can be made to fail.

use std::cell::{Cell, RefCell};
use std::future::Future;

use bytemuck::Pod;
use fxhash::FxHashMap;

use crate::utils::yield_now;
use crate::{
    gpu, BufferRole, BufferSpec, Device, Kernel, RenderError, Result, Scene,
    WorkingBuffers,
};

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    UploadScene { triangles: usize },
    CreateBuffer(BufferSpec),
    DestroyBuffer(BufferRole),
    Bind { pixel_count: u32 },
    Unbind,
    WriteParams { offset: u64, bytes: Vec<u8> },
    ClearOutput,
    Dispatch(Kernel, gpu::Workgroups),
    Present,
    Submit,
    Wait,
}

#[derive(Debug)]
pub struct HostBuffer {
    id: usize,
    role: BufferRole,
}

#[derive(Debug, Default)]
pub struct HostDevice {
    commands: RefCell<Vec<Command>>,
    memory: RefCell<Memory>,
    allocations: Cell<usize>,
    fail_allocation_after: Cell<Option<usize>>,
    fail_next_wait: Cell<bool>,
}

impl HostDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Device with working buffers for a `pixel_count x 1` image already
    /// allocated and bound, and the command log empty.
    pub fn with_buffers(pixel_count: u32) -> Self {
        let this = Self::new();

        let buffers = WorkingBuffers::allocate(&this, pixel_count)
            .expect("allocation failed");

        this.bind(&buffers);

        {
            let mut memory = this.memory.borrow_mut();

            memory.params.width = pixel_count;
            memory.params.height = 1;
            memory.params.slot_count = pixel_count.next_power_of_two();
        }

        this.commands.borrow_mut().clear();
        this
    }

    pub fn commands(&self) -> Vec<Command> {
        self.commands.borrow().clone()
    }

    pub fn count(&self, command: &Command) -> usize {
        self.commands.borrow().iter().filter(|c| *c == command).count()
    }

    pub fn dispatches(&self, kernel: Kernel) -> usize {
        self.commands
            .borrow()
            .iter()
            .filter(|c| matches!(c, Command::Dispatch(k, _) if *k == kernel))
            .count()
    }

    pub fn params(&self) -> gpu::FrameParams {
        self.memory.borrow().params
    }

    pub fn live_buffers(&self) -> usize {
        self.memory.borrow().buffers.len()
    }

    /// Total number of buffers ever allocated.
    pub fn allocations(&self) -> usize {
        self.allocations.get()
    }

    /// Lets `n` more allocations succeed and fails the one after.
    pub fn fail_allocation_after(&self, n: usize) {
        self.fail_allocation_after.set(Some(n));
    }

    pub fn fail_next_wait(&self) {
        self.fail_next_wait.set(true);
    }

    pub fn peek(&self, role: BufferRole) -> Vec<u32> {
        self.peek_pod(role)
    }

    pub fn peek_pod<T>(&self, role: BufferRole) -> Vec<T>
    where
        T: Pod,
    {
        self.memory.borrow_mut().load(role)
    }

    /// Overwrites the beginning of given buffer.
    pub fn poke(&self, role: BufferRole, words: &[u32]) {
        self.poke_pod(role, words);
    }

    pub fn poke_pod<T>(&self, role: BufferRole, items: &[T])
    where
        T: Pod,
    {
        let mut memory = self.memory.borrow_mut();
        let bytes: &[u8] = bytemuck::cast_slice(items);
        let words = memory.words(role);

        bytemuck::cast_slice_mut::<u32, u8>(words)[..bytes.len()]
            .copy_from_slice(bytes);
    }

    fn record(&self, command: Command) {
        self.commands.borrow_mut().push(command);
    }
}

impl Device for HostDevice {
    type Buffer = HostBuffer;

    fn upload_scene(&self, scene: &Scene) -> Result<()> {
        self.record(Command::UploadScene {
            triangles: scene.triangles().len(),
        });

        Ok(())
    }

    fn create_buffer(&self, spec: BufferSpec) -> Result<HostBuffer> {
        self.record(Command::CreateBuffer(spec));

        match self.fail_allocation_after.get() {
            Some(0) => {
                self.fail_allocation_after.set(None);

                return Err(RenderError::Allocation {
                    role: spec.role,
                    size: spec.size,
                    reason: "injected failure".into(),
                });
            }

            Some(n) => {
                self.fail_allocation_after.set(Some(n - 1));
            }

            None => (),
        }

        let mut memory = self.memory.borrow_mut();
        let id = memory.next_id;

        memory.next_id += 1;
        memory.buffers.insert(id, vec![0; spec.size as usize / 4]);

        self.allocations.set(self.allocations.get() + 1);

        Ok(HostBuffer {
            id,
            role: spec.role,
        })
    }

    fn destroy_buffer(&self, buffer: HostBuffer) {
        self.record(Command::DestroyBuffer(buffer.role));
        self.memory.borrow_mut().buffers.remove(&buffer.id);
    }

    fn bind(&self, buffers: &WorkingBuffers<HostBuffer>) {
        self.record(Command::Bind {
            pixel_count: buffers.pixel_count(),
        });

        self.memory.borrow_mut().bound = buffers
            .iter()
            .map(|(role, buffer)| (role, buffer.id))
            .collect();
    }

    fn unbind(&self) {
        self.record(Command::Unbind);
        self.memory.borrow_mut().bound.clear();
    }

    fn write_params(&self, offset: u64, bytes: &[u8]) {
        self.record(Command::WriteParams {
            offset,
            bytes: bytes.to_vec(),
        });

        let mut memory = self.memory.borrow_mut();
        let offset = offset as usize;

        bytemuck::bytes_of_mut(&mut memory.params)
            [offset..offset + bytes.len()]
            .copy_from_slice(bytes);
    }

    fn clear_output(&self) {
        self.record(Command::ClearOutput);

        let mut memory = self.memory.borrow_mut();

        if !memory.bound.is_empty() {
            memory.words(BufferRole::Output).fill(0);
        }
    }

    fn dispatch(&self, kernel: Kernel, workgroups: gpu::Workgroups) {
        self.record(Command::Dispatch(kernel, workgroups));

        let mut memory = self.memory.borrow_mut();

        if !memory.bound.is_empty() {
            memory.execute(kernel, workgroups.invocations() as u32);
        }
    }

    fn present(&self) {
        self.record(Command::Present);
    }

    fn submit(&self) {
        self.record(Command::Submit);
    }

    fn on_submitted_work_done(&self) -> impl Future<Output = Result<()>> {
        self.record(Command::Wait);

        let failed = self.fail_next_wait.take();

        async move {
            yield_now().await;

            if failed {
                Err(RenderError::Device("injected failure".into()))
            } else {
                Ok(())
            }
        }
    }

    fn read_output(&self) -> impl Future<Output = Result<Vec<[f32; 4]>>> {
        let bound = self
            .memory
            .borrow()
            .bound
            .contains_key(&BufferRole::Output);

        let output = if bound {
            self.peek_pod(BufferRole::Output)
        } else {
            Vec::new()
        };

        async move { Ok(output) }
    }
}

/// Number of radiance units one sample of the synthetic scene deposits into
/// given pixel: every shaded bounce adds one, and the ray dies after hitting
/// material #0.
pub fn synthetic_sample(pixel: u32, sample: u32, max_bounces: u32) -> u32 {
    let mut radiance = 0;

    for bounce in 0..max_bounces {
        radiance += 1;

        if synthetic_material(pixel, sample, bounce) == 0 {
            break;
        }
    }

    radiance
}

fn synthetic_material(pixel: u32, sample: u32, bounce: u32) -> u32 {
    let mut x = pixel.wrapping_mul(0x9e37_79b9)
        ^ sample.wrapping_mul(0x85eb_ca6b)
        ^ bounce.wrapping_mul(0xc2b2_ae35);

    x ^= x >> 16;
    x = x.wrapping_mul(0x7feb_352d);
    x ^= x >> 15;

    x % 6
}

#[derive(Debug, Default)]
struct Memory {
    params: gpu::FrameParams,
    buffers: FxHashMap<usize, Vec<u32>>,
    bound: FxHashMap<BufferRole, usize>,
    next_id: usize,
}

impl Memory {
    fn words(&mut self, role: BufferRole) -> &mut Vec<u32> {
        let id = *self
            .bound
            .get(&role)
            .unwrap_or_else(|| panic!("`{role}` is not bound"));

        self.buffers
            .get_mut(&id)
            .unwrap_or_else(|| panic!("`{role}` used after being destroyed"))
    }

    fn load<T>(&mut self, role: BufferRole) -> Vec<T>
    where
        T: Pod,
    {
        bytemuck::cast_slice::<u32, T>(self.words(role)).to_vec()
    }

    fn store<T>(&mut self, role: BufferRole, items: &[T])
    where
        T: Pod,
    {
        self.words(role)
            .copy_from_slice(bytemuck::cast_slice::<T, u32>(items));
    }

    fn execute(&mut self, kernel: Kernel, threads: u32) {
        use BufferRole::*;

        let p = self.params;
        let pixels = p.width * p.height;
        let slots = p.slot_count;

        match kernel {
            Kernel::RenderFull | Kernel::RenderSample => {
                let samples = if kernel == Kernel::RenderFull {
                    0..(p.supersample_rate.pow(2) * p.samples_per_grid_cell)
                } else {
                    p.sample_index..(p.sample_index + 1)
                };

                let mut output: Vec<[f32; 4]> = self.load(Output);

                for pixel in 0..threads.min(pixels) {
                    for sample in samples.clone() {
                        output[pixel as usize][0] +=
                            synthetic_sample(pixel, sample, p.max_bounces)
                                as f32;
                    }
                }

                self.store(Output, &output);
            }

            Kernel::BeginPass => {
                let mut rays: Vec<gpu::Ray> = self.load(Rays);
                let mut radiance: Vec<[f32; 4]> = self.load(Radiance);

                if threads > 0 {
                    self.words(State)[0] = pixels;
                }

                for slot in 0..threads.min(pixels) {
                    rays[slot as usize] = gpu::Ray {
                        pixel: slot,
                        alive: 1,
                        throughput: [1.0; 3],
                        rng: 0,
                        ..Default::default()
                    };

                    radiance[slot as usize] = [0.0; 4];
                }

                self.store(Rays, &rays);
                self.store(Radiance, &radiance);
            }

            Kernel::Intersect => {
                let live = self.words(State)[0];
                let rays: Vec<gpu::Ray> = self.load(Rays);
                let mut hits: Vec<gpu::Hit> = self.load(Hits);

                for slot in 0..threads.min(live) as usize {
                    let ray = rays[slot];

                    hits[slot] = gpu::Hit::default();

                    if ray.is_alive() {
                        // the bounce counter rides in `rng`
                        hits[slot].material = synthetic_material(
                            ray.pixel,
                            p.sample_index,
                            ray.rng,
                        );
                    }
                }

                self.store(Hits, &hits);
            }

            Kernel::Shade => {
                let live = self.words(State)[0];
                let mut rays: Vec<gpu::Ray> = self.load(Rays);
                let hits: Vec<gpu::Hit> = self.load(Hits);
                let mut radiance: Vec<[f32; 4]> = self.load(Radiance);

                for slot in 0..threads.min(live) as usize {
                    let ray = &mut rays[slot];

                    if !ray.is_alive() {
                        continue;
                    }

                    radiance[ray.pixel as usize][0] += 1.0;
                    ray.rng += 1;

                    if hits[slot].material == 0 {
                        ray.alive = 0;
                    }
                }

                self.store(Rays, &rays);
                self.store(Radiance, &radiance);
            }

            Kernel::FinishPass => {
                let radiance: Vec<[f32; 4]> = self.load(Radiance);
                let mut output: Vec<[f32; 4]> = self.load(Output);

                for pixel in 0..threads.min(pixels) as usize {
                    for channel in 0..4 {
                        output[pixel][channel] += radiance[pixel][channel];
                    }
                }

                self.store(Output, &output);
            }

            Kernel::ScanUpsweep | Kernel::ScanDownsweep => {
                let stride = p.scan_step;
                let scan = self.words(Scan);

                for id in 0..threads.min(p.scan_len / stride) {
                    let right = ((id + 1) * stride - 1) as usize;
                    let left = right - stride as usize / 2;

                    if kernel == Kernel::ScanUpsweep {
                        scan[right] = scan[right].wrapping_add(scan[left]);
                    } else {
                        let carried = scan[left];

                        scan[left] = scan[right];
                        scan[right] = scan[right].wrapping_add(carried);
                    }
                }
            }

            Kernel::ScanClearRoot => {
                if threads > 0 {
                    self.words(Scan)[p.scan_len as usize - 1] = 0;
                }
            }

            Kernel::CompactMark => {
                let live = self.words(State)[0];
                let rays: Vec<gpu::Ray> = self.load(Rays);
                let mut flags = self.load::<u32>(Flags);
                let mut scan = self.load::<u32>(Scan);

                for slot in 0..threads.min(slots) {
                    let flag = (slot < live && rays[slot as usize].is_alive())
                        as u32;

                    flags[slot as usize] = flag;
                    scan[slot as usize] = flag;
                }

                self.store(Flags, &flags);
                self.store(Scan, &scan);
            }

            Kernel::CompactScatter => {
                let rays: Vec<gpu::Ray> = self.load(Rays);
                let hits: Vec<gpu::Hit> = self.load(Hits);
                let flags = self.load::<u32>(Flags);
                let scan = self.load::<u32>(Scan);
                let mut ray_scratch: Vec<gpu::Ray> = self.load(RayScratch);
                let mut hit_scratch: Vec<gpu::Hit> = self.load(HitScratch);
                let last = slots as usize - 1;

                if threads > last as u32 {
                    self.words(State)[0] = scan[last] + flags[last];
                }

                for slot in 0..threads.min(slots) as usize {
                    if flags[slot] == 0 {
                        continue;
                    }

                    ray_scratch[scan[slot] as usize] = rays[slot];
                    hit_scratch[scan[slot] as usize] = hits[slot];
                }

                self.store(RayScratch, &ray_scratch);
                self.store(HitScratch, &hit_scratch);
            }

            Kernel::CompactCopyBack | Kernel::RadixCopyBack => {
                let live = self.words(State)[0];
                let mut rays: Vec<gpu::Ray> = self.load(Rays);
                let mut hits: Vec<gpu::Hit> = self.load(Hits);
                let ray_scratch: Vec<gpu::Ray> = self.load(RayScratch);
                let hit_scratch: Vec<gpu::Hit> = self.load(HitScratch);

                for slot in 0..threads.min(live) as usize {
                    rays[slot] = ray_scratch[slot];
                    hits[slot] = hit_scratch[slot];
                }

                self.store(Rays, &rays);
                self.store(Hits, &hits);
            }

            Kernel::RadixCount => {
                let live = self.words(State)[0];
                let hits: Vec<gpu::Hit> = self.load(Hits);
                let mut scan = self.load::<u32>(Scan);

                for slot in 0..threads.min(slots) {
                    let digit = radix_digit(&hits, live, slot, p.radix_shift);

                    for bucket in 0..gpu::RADIX_BUCKETS {
                        scan[(bucket * slots + slot) as usize] =
                            (bucket == digit) as u32;
                    }
                }

                self.store(Scan, &scan);
            }

            Kernel::RadixScatter => {
                let live = self.words(State)[0];
                let rays: Vec<gpu::Ray> = self.load(Rays);
                let hits: Vec<gpu::Hit> = self.load(Hits);
                let scan = self.load::<u32>(Scan);
                let mut ray_scratch: Vec<gpu::Ray> = self.load(RayScratch);
                let mut hit_scratch: Vec<gpu::Hit> = self.load(HitScratch);

                for slot in 0..threads.min(live) {
                    let digit = radix_digit(&hits, live, slot, p.radix_shift);
                    let target = scan[(digit * slots + slot) as usize] as usize;

                    ray_scratch[target] = rays[slot as usize];
                    hit_scratch[target] = hits[slot as usize];
                }

                self.store(RayScratch, &ray_scratch);
                self.store(HitScratch, &hit_scratch);
            }
        }
    }
}

fn radix_digit(hits: &[gpu::Hit], live: u32, slot: u32, shift: u32) -> u32 {
    let key = if slot < live {
        hits[slot as usize].sort_key()
    } else {
        gpu::DEAD_KEY
    };

    (key >> shift) & (gpu::RADIX_BUCKETS - 1)
}
