//! Core value types for hostlink.
//!
//! This crate defines the small, host-agnostic vocabulary the adapter speaks
//! when it marshals values in and out of a host module:
//! - [`ValueKind`] — the closed set of field kinds the adapter can marshal
//! - [`WorkingId`] — 128-bit identifier the host uses for installed plugin copies
//! - [`AssemblyVersion`] — ordered version tuple with a canonical dotted form
//!
//! Nothing here knows about a particular host; host shapes are discovered at
//! run time by `hostlink-model`.

mod ids;
mod kind;
mod version;

pub use ids::WorkingId;
pub use kind::ValueKind;
pub use version::{AssemblyVersion, VersionError};
