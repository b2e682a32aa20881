//! Structural adapter over a host module's private data model.
//!
//! Defines how hostlink sees a host it cannot link against:
//! - [`HostModule`] — the reflection protocol a loaded host answers
//! - [`SchemaContract`] — the exact fields the adapter depends on for a type
//! - [`TypeRegistry`] — resolves contracts into [`TypeHandle`]s and
//!   [`FieldHandle`]s, failing on missing types, missing fields, or drift
//! - [`ObjectBuilder`] — creates host instances and reads/writes their fields
//! - [`MemoryHost`] — an in-process host, used to embed a model directly and
//!   to exercise the adapter without a native module
//!
//! Every contract is checked once, when the registry resolves it. Call sites
//! never look fields up ad hoc.

mod builder;
mod error;
mod host;
mod memory;
mod registry;
mod schema;

pub use builder::ObjectBuilder;
pub use error::{HostCallError, ModelError, ModelResult};
pub use host::{FieldDescriptor, FieldValue, HostModule, HostObject, TypeDescriptor};
pub use memory::{MemoryHost, MemoryHostBuilder, MemoryObject, TypeDef};
pub use registry::{FieldHandle, OpaqueInstance, ResolvedType, TypeHandle, TypeRegistry};
pub use schema::SchemaContract;
