//! Four-part assembly versions.
//!
//! Hosts stamp their plugin manifests with `major.minor[.build[.revision]]`
//! versions. A missing component is distinct from zero and orders before
//! any present component, so `1.0` < `1.0.0` < `1.0.0.0`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Why a version could not be built or parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    #[error("empty version string")]
    Empty,

    #[error("expected 2 to 4 components, got {0}")]
    ComponentCount(usize),

    #[error("component '{part}' in '{version}': {source}")]
    Component {
        part: String,
        version: String,
        #[source]
        source: ParseIntError,
    },
}

/// An ordered version tuple of two to four non-negative components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssemblyVersion {
    major: u32,
    minor: u32,
    build: Option<u32>,
    revision: Option<u32>,
}

impl AssemblyVersion {
    /// Creates a two-part version.
    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self {
            major,
            minor,
            build: None,
            revision: None,
        }
    }

    /// Creates a full four-part version.
    #[must_use]
    pub const fn full(major: u32, minor: u32, build: u32, revision: u32) -> Self {
        Self {
            major,
            minor,
            build: Some(build),
            revision: Some(revision),
        }
    }

    /// Builds a version from its components, which must number two to four.
    pub fn from_components(components: &[u32]) -> Result<Self, VersionError> {
        match *components {
            [major, minor] => Ok(Self::new(major, minor)),
            [major, minor, build] => Ok(Self {
                major,
                minor,
                build: Some(build),
                revision: None,
            }),
            [major, minor, build, revision] => Ok(Self::full(major, minor, build, revision)),
            _ => Err(VersionError::ComponentCount(components.len())),
        }
    }

    #[must_use]
    pub const fn major(&self) -> u32 {
        self.major
    }

    #[must_use]
    pub const fn minor(&self) -> u32 {
        self.minor
    }

    #[must_use]
    pub const fn build(&self) -> Option<u32> {
        self.build
    }

    #[must_use]
    pub const fn revision(&self) -> Option<u32> {
        self.revision
    }

    /// Returns the present components in order.
    #[must_use]
    pub fn components(&self) -> Vec<u32> {
        let mut out = vec![self.major, self.minor];
        out.extend(self.build);
        out.extend(self.revision);
        out
    }
}

impl fmt::Display for AssemblyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if let Some(build) = self.build {
            write!(f, ".{build}")?;
        }
        if let Some(revision) = self.revision {
            write!(f, ".{revision}")?;
        }
        Ok(())
    }
}

impl FromStr for AssemblyVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(VersionError::Empty);
        }
        let components = trimmed
            .split('.')
            .map(|part| {
                part.parse::<u32>().map_err(|source| VersionError::Component {
                    part: part.to_string(),
                    version: trimmed.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_components(&components)
    }
}

impl Serialize for AssemblyVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AssemblyVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
