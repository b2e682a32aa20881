use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of value a host field holds, as far as the adapter is concerned.
///
/// Only the first five kinds can be marshaled. Fields of any other host type
/// are still discovered (so contracts can name them) but report
/// [`ValueKind::Unsupported`]; the builder rejects every read and write of
/// them, and serializers carry their values as raw JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Text,
    Bool,
    Uuid,
    Version,
    Object,
    Unsupported,
}

impl ValueKind {
    /// Whether values of this kind can cross the adapter at all.
    #[must_use]
    pub const fn is_marshalable(self) -> bool {
        !matches!(self, Self::Unsupported)
    }

    /// Whether the host represents this kind as a reference that may be null.
    #[must_use]
    pub const fn is_nullable(self) -> bool {
        matches!(self, Self::Text | Self::Version | Self::Object)
    }

    /// Lowercase name used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Bool => "bool",
            Self::Uuid => "uuid",
            Self::Version => "version",
            Self::Object => "object",
            Self::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
