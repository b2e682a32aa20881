//! Error types for installer operations.

use std::path::PathBuf;

use hostlink_bridge::BridgeError;
use hostlink_host::HostError;
use hostlink_model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstallerError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("manifest of {type_name} has no assembly version")]
    MissingVersion { type_name: String },

    #[error("invalid configuration {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type InstallerResult<T> = Result<T, InstallerError>;

impl InstallerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
