//! Frame graph error types.
//!
//! Malformed graphs are programmer errors and panic at build time. The errors
//! here are the failures that can only be observed while a compiled graph is
//! executed: allocation failures and device loss reported by the backend.

use thiserror::Error;

use crate::backend::BackendError;

/// Errors that abort execution of the in-flight frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameGraphError {
    /// The pool had no compatible entry and the backend could not create one.
    #[error("failed to allocate resource '{resource}': {source}")]
    Allocation {
        /// Name of the resource being allocated.
        resource: String,
        /// Backend failure.
        #[source]
        source: BackendError,
    },

    /// A backend call failed while recording or submitting the frame.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl FrameGraphError {
    /// Returns true if the device was lost and must be recreated.
    pub fn is_device_lost(&self) -> bool {
        matches!(
            self,
            Self::Backend(BackendError::DeviceLost)
                | Self::Allocation {
                    source: BackendError::DeviceLost,
                    ..
                }
        )
    }
}
