use std::fmt;
use std::path::PathBuf;

/// Why a path was turned down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Equal to or inside this protected root.
    ProtectedRoot(PathBuf),
    /// The path, or its parent, does not exist or cannot be inspected.
    Missing,
    NotADirectory,
    ReadOnly,
    SystemAttribute,
    /// Creating the directory failed.
    CreateFailed(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProtectedRoot(root) => write!(f, "inside protected directory {}", root.display()),
            Self::Missing => f.write_str("does not exist"),
            Self::NotADirectory => f.write_str("not a directory"),
            Self::ReadOnly => f.write_str("read-only"),
            Self::SystemAttribute => f.write_str("marked as a system directory"),
            Self::CreateFailed(reason) => write!(f, "could not be created: {reason}"),
        }
    }
}

/// Outcome of a path check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathVerdict {
    Acceptable,
    Rejected(RejectReason),
    /// The validator could not decide (malformed input, unexpected I/O).
    Indeterminate(String),
}

impl PathVerdict {
    pub const STATUS_REJECTED: u8 = 0;
    pub const STATUS_ACCEPTABLE: u8 = 1;
    pub const STATUS_INDETERMINATE: u8 = 0xFF;

    #[must_use]
    pub fn is_acceptable(&self) -> bool {
        matches!(self, Self::Acceptable)
    }

    /// `1` acceptable, `0` rejected, `0xFF` indeterminate.
    #[must_use]
    pub fn status_byte(&self) -> u8 {
        match self {
            Self::Acceptable => Self::STATUS_ACCEPTABLE,
            Self::Rejected(_) => Self::STATUS_REJECTED,
            Self::Indeterminate(_) => Self::STATUS_INDETERMINATE,
        }
    }
}

impl fmt::Display for PathVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Acceptable => f.write_str("acceptable"),
            Self::Rejected(reason) => write!(f, "rejected: {reason}"),
            Self::Indeterminate(message) => write!(f, "indeterminate: {message}"),
        }
    }
}
