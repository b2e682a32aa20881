//! Serialization bridge.
//!
//! hostlink never re-implements the host's file format. It binds to the
//! serializer library the host already ships ([`SerializerBinding::locate`]),
//! borrows the options value the host uses for its own files, and encodes or
//! decodes opaque instances through it.
//!
//! [`MemorySerializer`] is an in-process serializer speaking the same
//! protocol, for hosts embedded in Rust and for tests.

mod binding;
mod error;
mod json;
mod module;

pub use binding::{strip_bom, SerializerBinding, SerializerOptions};
pub use error::{BridgeError, BridgeResult};
pub use json::{JsonSettings, MemorySerializer, TypeNameHandling};
pub use module::{DecodeEntry, EncodeEntry, EntryPoints, Formatting, OptionsType, SerializerModule};
