//! Wavefront path tracer: drives a fixed set of compute kernels that render
//! a triangle scene progressively into an accumulation buffer.

mod buffers;
mod compaction;
mod config;
mod device;
mod error;
mod frame;
mod generation;
mod passes;
mod pool;
mod progress;
mod radix;
mod renderer;
mod scan;
mod scene;
mod utils;
mod wgpu_device;

#[cfg(test)]
mod testing;

pub use wavetrace_gpu as gpu;

pub use self::buffers::*;
pub use self::config::*;
pub use self::device::*;
pub use self::error::*;
pub(crate) use self::frame::*;
pub use self::generation::*;
pub(crate) use self::passes::*;
pub(crate) use self::pool::*;
pub use self::progress::*;
pub use self::renderer::*;
pub use self::scene::*;
pub use self::wgpu_device::*;
