use thiserror::Error;

use crate::BufferRole;

pub type Result<T, E = RenderError> = std::result::Result<T, E>;

/// Failures that abort a render attempt.
///
/// Superseded renders are not errors; they finish with
/// [`crate::RenderOutcome::Cancelled`].
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("couldn't allocate {role} buffer ({size} bytes): {reason}")]
    Allocation {
        role: BufferRole,
        size: u64,
        reason: String,
    },

    #[error("device failure: {0}")]
    Device(String),

    #[error("no compatible GPU adapter found")]
    AdapterNotFound,

    #[error("couldn't request device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),
}
