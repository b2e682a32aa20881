//! An in-process stand-in for the host, shaped like the real one.
//!
//! The reference host declares the types named in a [`TypeNames`] with the
//! fields the real host carries, and publishes tagged, indented settings
//! under the configured default-options symbol. It lets the installer run
//! end to end without a native host library.

use std::sync::Arc;

use hostlink_bridge::{JsonSettings, MemorySerializer, SerializerModule};
use hostlink_model::{HostModule, HostObject, MemoryHost, TypeDef};

use crate::config::InstallerConfig;
use crate::contracts::{configuration, manifest, profile, profile_plugin, repo_settings};

pub const REFERENCE_MODULE: &str = "Dalamud";

pub fn reference_host(config: &InstallerConfig) -> MemoryHost {
    let names = &config.types;

    let manifest = TypeDef::new(&names.local_manifest)
        .text("Author")
        .text("Name")
        .text("Punchline")
        .text("Description")
        .unsupported("Tags", "List`1")
        .bool("IsHide")
        .text("InternalName")
        .version(manifest::ASSEMBLY_VERSION)
        .version("TestingAssemblyVersion")
        .text("RepoUrl")
        .unsupported("DalamudApiLevel", "Int32")
        .text("IconUrl")
        .unsupported("ImageUrls", "List`1")
        .unsupported("CategoryTags", "List`1")
        .text("Changelog")
        .unsupported("DownloadCount", "Int64")
        .unsupported("LastUpdate", "Int64")
        .bool("AcceptsFeedback")
        .bool("Disabled")
        .bool("Testing")
        .text(manifest::INSTALLED_FROM_URL)
        .uuid(manifest::WORKING_PLUGIN_ID);

    let profile_model = TypeDef::new(&names.profile_model)
        .uuid("Guid")
        .text("Name")
        .bool("IsEnabled")
        .unsupported(profile::PLUGINS, "List`1")
        .nested(
            TypeDef::new(&names.profile_plugin)
                .text(profile_plugin::INTERNAL_NAME)
                .uuid(profile_plugin::WORKING_PLUGIN_ID)
                .bool(profile_plugin::IS_ENABLED),
        );

    let configuration = TypeDef::new(&names.configuration)
        .unsupported(configuration::THIRD_REPO_LIST, "List`1")
        .object(configuration::DEFAULT_PROFILE, &names.profile_model)
        .bool("ThirdRepoSpeedbumpDismissed")
        .text("LastVersion");

    let repo = TypeDef::new(&names.repo_settings)
        .text(repo_settings::URL)
        .bool(repo_settings::IS_ENABLED)
        .text(repo_settings::NAME);

    MemoryHost::builder(REFERENCE_MODULE)
        .with_type(manifest)
        .with_type(profile_model)
        .with_type(configuration)
        .with_type(repo)
        .static_value(
            config.serializer.default_options.clone(),
            HostObject::new(JsonSettings::tagged()),
        )
        .build()
}

pub fn reference_serializer(host: Arc<dyn HostModule>, config: &InstallerConfig) -> MemorySerializer {
    MemorySerializer::with_entry_points(host, config.serializer.clone())
}

/// Host and serializer, ready for [`crate::Installer::from_modules`].
pub fn reference_modules(config: &InstallerConfig) -> (Arc<dyn HostModule>, Arc<dyn SerializerModule>) {
    let host: Arc<dyn HostModule> = Arc::new(reference_host(config));
    let serializer: Arc<dyn SerializerModule> = Arc::new(reference_serializer(host.clone(), config));
    (host, serializer)
}
