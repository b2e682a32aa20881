//! Native module loading.
//!
//! A host ships as a shared library exporting a reflection vtable
//! ([`abi::HostVTable`]); its serializer ships as another library exporting
//! encode/decode entry points and an options type by name. This crate loads
//! both with `libloading` and adapts them to [`hostlink_model::HostModule`]
//! and [`hostlink_bridge::SerializerModule`].

pub mod abi;
mod error;
mod loader;
mod native;

pub use error::{HostError, HostResult};
pub use loader::{ModulePaths, ModuleSet};
pub use native::{NativeHost, NativeObject, NativeSerializer};
