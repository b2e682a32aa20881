//! Errors raised at the C boundary.

use hostlink_installer::InstallerError;
use thiserror::Error;

use crate::status::CallStatus;

#[derive(Debug, Error)]
pub enum FfiError {
    #[error("installer is not ready: {0}")]
    NotReady(String),

    #[error("no allocator registered")]
    NoAllocator,

    #[error("allocator returned null for {len} bytes")]
    AllocatorFailed { len: usize },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Installer(#[from] InstallerError),
}

pub type FfiResult<T> = Result<T, FfiError>;

impl FfiError {
    pub fn status(&self) -> CallStatus {
        match self {
            Self::NotReady(_) => CallStatus::NotReady,
            Self::NoAllocator | Self::AllocatorFailed { .. } => CallStatus::NoAllocator,
            Self::InvalidInput(_) | Self::Installer(InstallerError::InvalidInput(_)) => {
                CallStatus::InvalidInput
            }
            Self::Installer(_) => CallStatus::Failed,
        }
    }
}
