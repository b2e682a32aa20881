//! Plugin installation against a host's private data model.
//!
//! [`Installer`] resolves the host types it needs through explicit schema
//! contracts, binds to the host's own serializer and then builds:
//! - third-party repository entries for the host configuration
//! - profile entries that enable an installed plugin
//! - filled-out plugin manifests with a working id and source url
//!
//! It also decides which directories are acceptable for user data, through
//! `hostlink-paths`. Downloading and extracting plugins is left to a
//! [`PluginFetcher`].

pub mod collab;
pub mod config;
pub mod contracts;
mod error;
mod installer;
pub mod reference;

pub use collab::{FetchedPlugin, JsonModDirectoryStore, ModDirectoryStore, PluginFetcher};
pub use config::{InstallerConfig, PathPolicy, TypeNames};
pub use error::{InstallerError, InstallerResult};
pub use installer::{FilledManifest, InstalledPlugin, Installer, PluginEntry};
