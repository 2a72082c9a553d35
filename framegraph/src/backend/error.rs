//! Backend error types.

use thiserror::Error;

/// Errors reported by a [`GpuBackend`](super::GpuBackend).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Failed to create a resource or view.
    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),
    /// Out of GPU memory.
    #[error("out of GPU memory")]
    OutOfMemory,
    /// The device was lost. Nothing recorded for the current frame is valid.
    #[error("GPU device lost")]
    DeviceLost,
    /// Internal backend error.
    #[error("internal backend error: {0}")]
    Internal(String),
}

/// Result alias for backend calls.
pub type BackendResult<T> = Result<T, BackendError>;
