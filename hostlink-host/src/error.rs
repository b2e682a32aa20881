//! Error types for native module loading.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to load module {path}: {reason}")]
    ModuleLoadFailed { path: PathBuf, reason: String },

    #[error("symbol {symbol} not found in {library}")]
    MissingSymbol { library: String, symbol: String },

    #[error("host ABI {found} is incompatible with loader ABI {expected}")]
    AbiMismatch { expected: u32, found: u32 },
}

pub type HostResult<T> = Result<T, HostError>;
