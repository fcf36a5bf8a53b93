use std::fmt;
use std::future::Future;
use std::mem;

use crate::{gpu, Result, Scene};

/// The narrow interface through which the renderer drives the GPU.
///
/// Commands are recorded in call order and execute in that order on a single
/// queue; nothing else synchronizes dependent kernels. In particular, a
/// parameter write must be observed by every dispatch issued after it and by
/// none issued before it.
pub trait Device {
    type Buffer;

    /// Uploads the scene buffers; called once, before any render.
    fn upload_scene(&self, scene: &Scene) -> Result<()>;

    fn create_buffer(&self, spec: BufferSpec) -> Result<Self::Buffer>;

    /// Releases the buffer's memory right away, without waiting for the
    /// handle to be dropped.
    fn destroy_buffer(&self, buffer: Self::Buffer);

    /// Points every kernel at a new generation of working buffers.
    fn bind(&self, buffers: &WorkingBuffers<Self::Buffer>);

    /// Drops every reference to the bound generation; until the next
    /// [`Device::bind()`], there's nothing to present or read back.
    fn unbind(&self);

    fn write_params(&self, offset: u64, bytes: &[u8]);
    fn clear_output(&self);
    fn dispatch(&self, kernel: Kernel, workgroups: gpu::Workgroups);

    /// Draws the output accumulator onto the presentation target, if there's
    /// one.
    fn present(&self);

    fn submit(&self);

    /// Submits pending work and resolves once the device has finished
    /// everything submitted so far.
    fn on_submitted_work_done(&self) -> impl Future<Output = Result<()>>;

    fn read_output(&self) -> impl Future<Output = Result<Vec<[f32; 4]>>>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BufferRole {
    Params,
    Triangles,
    Materials,
    BoundingBoxes,
    Rays,
    Hits,
    RayScratch,
    HitScratch,
    Radiance,
    Output,
    Flags,
    Scan,
    State,
}

impl BufferRole {
    /// Roles making up one generation of working buffers, in allocation
    /// order.
    pub const WORKING: [BufferRole; 9] = [
        BufferRole::Rays,
        BufferRole::Hits,
        BufferRole::RayScratch,
        BufferRole::HitScratch,
        BufferRole::Radiance,
        BufferRole::Output,
        BufferRole::Flags,
        BufferRole::Scan,
        BufferRole::State,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BufferRole::Params => "params",
            BufferRole::Triangles => "triangles",
            BufferRole::Materials => "materials",
            BufferRole::BoundingBoxes => "bounding_boxes",
            BufferRole::Rays => "rays",
            BufferRole::Hits => "hits",
            BufferRole::RayScratch => "ray_scratch",
            BufferRole::HitScratch => "hit_scratch",
            BufferRole::Radiance => "radiance",
            BufferRole::Output => "output",
            BufferRole::Flags => "flags",
            BufferRole::Scan => "scan",
            BufferRole::State => "state",
        }
    }

    /// Whether the buffer's content only lives for the duration of a single
    /// sample (and so must be produced before anything reads it).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BufferRole::Rays
                | BufferRole::Hits
                | BufferRole::RayScratch
                | BufferRole::HitScratch
                | BufferRole::Radiance
                | BufferRole::Flags
                | BufferRole::Scan
                | BufferRole::State
        )
    }

    fn bit(&self) -> u32 {
        1 << (*self as u32)
    }
}

impl fmt::Display for BufferRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of buffer roles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BufferRoles(u32);

impl BufferRoles {
    pub fn insert(&mut self, role: BufferRole) {
        self.0 |= role.bit();
    }

    pub fn contains(&self, role: BufferRole) -> bool {
        self.0 & role.bit() != 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferSpec {
    pub role: BufferRole,
    pub size: u64,
}

impl BufferSpec {
    /// Size of every working buffer for given pixel count.
    ///
    /// Per-pixel buffers are sized to the pixel count, scan scratch to its
    /// power-of-two ceiling (four counters per slot, for the radix digits).
    pub fn working(pixel_count: u32) -> [BufferSpec; 9] {
        let pixels = pixel_count as u64;
        let slots = pixel_count.next_power_of_two() as u64;

        BufferRole::WORKING.map(|role| {
            let size = match role {
                BufferRole::Rays | BufferRole::RayScratch => {
                    pixels * mem::size_of::<gpu::Ray>() as u64
                }
                BufferRole::Hits | BufferRole::HitScratch => {
                    pixels * mem::size_of::<gpu::Hit>() as u64
                }
                BufferRole::Radiance | BufferRole::Output => {
                    pixels * mem::size_of::<[f32; 4]>() as u64
                }
                BufferRole::Flags => slots * 4,
                BufferRole::Scan => slots * 4 * gpu::RADIX_BUCKETS as u64,
                BufferRole::State => 16,
                _ => unreachable!(),
            };

            BufferSpec { role, size }
        })
    }
}

/// One generation of per-resolution buffers.
#[derive(Debug)]
pub struct WorkingBuffers<B> {
    pixel_count: u32,
    buffers: Vec<(BufferRole, B)>,
}

impl<B> WorkingBuffers<B> {
    /// Allocates every working buffer for given pixel count; on failure,
    /// destroys whatever got allocated before bailing out.
    pub fn allocate<D>(device: &D, pixel_count: u32) -> Result<Self>
    where
        D: Device<Buffer = B>,
    {
        let mut buffers = Vec::with_capacity(BufferRole::WORKING.len());

        for spec in BufferSpec::working(pixel_count) {
            match device.create_buffer(spec) {
                Ok(buffer) => {
                    buffers.push((spec.role, buffer));
                }

                Err(err) => {
                    for (_, buffer) in buffers {
                        device.destroy_buffer(buffer);
                    }

                    return Err(err);
                }
            }
        }

        Ok(Self {
            pixel_count,
            buffers,
        })
    }

    pub fn pixel_count(&self) -> u32 {
        self.pixel_count
    }

    pub fn get(&self, role: BufferRole) -> &B {
        self.buffers
            .iter()
            .find_map(|(r, buffer)| (*r == role).then_some(buffer))
            .unwrap_or_else(|| panic!("{role} is not a working buffer"))
    }

    pub fn iter(&self) -> impl Iterator<Item = (BufferRole, &B)> {
        self.buffers.iter().map(|(role, buffer)| (*role, buffer))
    }

    pub fn destroy<D>(self, device: &D)
    where
        D: Device<Buffer = B>,
    {
        for (_, buffer) in self.buffers {
            device.destroy_buffer(buffer);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KernelModule {
    Tracing,
    Sorting,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kernel {
    RenderFull,
    RenderSample,
    BeginPass,
    Intersect,
    Shade,
    FinishPass,
    ScanUpsweep,
    ScanClearRoot,
    ScanDownsweep,
    CompactMark,
    CompactScatter,
    CompactCopyBack,
    RadixCount,
    RadixScatter,
    RadixCopyBack,
}

impl Kernel {
    pub const ALL: [Kernel; 15] = [
        Kernel::RenderFull,
        Kernel::RenderSample,
        Kernel::BeginPass,
        Kernel::Intersect,
        Kernel::Shade,
        Kernel::FinishPass,
        Kernel::ScanUpsweep,
        Kernel::ScanClearRoot,
        Kernel::ScanDownsweep,
        Kernel::CompactMark,
        Kernel::CompactScatter,
        Kernel::CompactCopyBack,
        Kernel::RadixCount,
        Kernel::RadixScatter,
        Kernel::RadixCopyBack,
    ];

    pub fn entry_point(&self) -> &'static str {
        match self {
            Kernel::RenderFull => "render_full",
            Kernel::RenderSample => "render_sample",
            Kernel::BeginPass => "begin_pass",
            Kernel::Intersect => "intersect",
            Kernel::Shade => "shade",
            Kernel::FinishPass => "finish_pass",
            Kernel::ScanUpsweep => "scan_upsweep",
            Kernel::ScanClearRoot => "scan_clear_root",
            Kernel::ScanDownsweep => "scan_downsweep",
            Kernel::CompactMark => "compact_mark",
            Kernel::CompactScatter => "compact_scatter",
            Kernel::CompactCopyBack => "compact_copy_back",
            Kernel::RadixCount => "radix_count",
            Kernel::RadixScatter => "radix_scatter",
            Kernel::RadixCopyBack => "radix_copy_back",
        }
    }

    pub fn module(&self) -> KernelModule {
        match self {
            Kernel::RenderFull
            | Kernel::RenderSample
            | Kernel::BeginPass
            | Kernel::Intersect
            | Kernel::Shade
            | Kernel::FinishPass => KernelModule::Tracing,

            _ => KernelModule::Sorting,
        }
    }

    pub fn reads(&self) -> &'static [BufferRole] {
        use BufferRole::*;

        match self {
            Kernel::RenderFull | Kernel::RenderSample => {
                &[Params, Triangles, Materials, BoundingBoxes, Output]
            }
            Kernel::BeginPass => &[Params],
            Kernel::Intersect => {
                &[Params, Triangles, BoundingBoxes, Rays, State]
            }
            Kernel::Shade => {
                &[Params, Materials, Rays, Hits, Radiance, State]
            }
            Kernel::FinishPass => &[Params, Radiance, Output],
            Kernel::ScanUpsweep
            | Kernel::ScanClearRoot
            | Kernel::ScanDownsweep => &[Params, Scan],
            Kernel::CompactMark => &[Params, Rays, State],
            Kernel::CompactScatter => &[Params, Rays, Hits, Flags, Scan],
            Kernel::CompactCopyBack | Kernel::RadixCopyBack => {
                &[Params, RayScratch, HitScratch, State]
            }
            Kernel::RadixCount => &[Params, Hits, State],
            Kernel::RadixScatter => &[Params, Rays, Hits, Scan, State],
        }
    }

    pub fn writes(&self) -> &'static [BufferRole] {
        use BufferRole::*;

        match self {
            Kernel::RenderFull | Kernel::RenderSample => &[Output],
            Kernel::BeginPass => &[Rays, Radiance, State],
            Kernel::Intersect => &[Hits],
            Kernel::Shade => &[Rays, Radiance],
            Kernel::FinishPass => &[Output],
            Kernel::ScanUpsweep
            | Kernel::ScanClearRoot
            | Kernel::ScanDownsweep => &[Scan],
            Kernel::CompactMark => &[Flags, Scan],
            Kernel::CompactScatter => &[RayScratch, HitScratch, State],
            Kernel::CompactCopyBack | Kernel::RadixCopyBack => &[Rays, Hits],
            Kernel::RadixCount => &[Scan],
            Kernel::RadixScatter => &[RayScratch, HitScratch],
        }
    }
}
