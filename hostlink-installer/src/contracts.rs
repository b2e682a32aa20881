//! The host fields the installer depends on.
//!
//! Repository settings and profile plugin entries are built from scratch, so
//! their contracts are exact: a new writable field on either type means the
//! installer would write incomplete entries, and resolution fails instead.
//!
//! The configuration and profile model contracts are only checked: the
//! installer never builds those types, but the entries it makes end up in
//! them, so a host whose lists moved is refused at initialization.

use hostlink_model::SchemaContract;

use crate::config::TypeNames;

pub mod manifest {
    pub const WORKING_PLUGIN_ID: &str = "WorkingPluginId";
    pub const INSTALLED_FROM_URL: &str = "InstalledFromUrl";
    pub const ASSEMBLY_VERSION: &str = "AssemblyVersion";
}

pub mod configuration {
    pub const THIRD_REPO_LIST: &str = "ThirdRepoList";
    pub const DEFAULT_PROFILE: &str = "DefaultProfile";
}

pub mod profile {
    pub const PLUGINS: &str = "Plugins";
}

pub mod profile_plugin {
    pub const INTERNAL_NAME: &str = "InternalName";
    pub const WORKING_PLUGIN_ID: &str = "WorkingPluginId";
    pub const IS_ENABLED: &str = "IsEnabled";
}

pub mod repo_settings {
    pub const URL: &str = "Url";
    pub const IS_ENABLED: &str = "IsEnabled";
    pub const NAME: &str = "Name";
}

pub fn local_manifest(names: &TypeNames) -> SchemaContract {
    SchemaContract::new(
        &names.local_manifest,
        [
            manifest::WORKING_PLUGIN_ID,
            manifest::INSTALLED_FROM_URL,
            manifest::ASSEMBLY_VERSION,
        ],
    )
}

pub fn configuration(names: &TypeNames) -> SchemaContract {
    SchemaContract::new(
        &names.configuration,
        [configuration::THIRD_REPO_LIST, configuration::DEFAULT_PROFILE],
    )
}

pub fn profile_model(names: &TypeNames) -> SchemaContract {
    SchemaContract::new(&names.profile_model, [profile::PLUGINS])
}

pub fn profile_plugin(names: &TypeNames) -> SchemaContract {
    SchemaContract::new(
        &names.profile_plugin,
        [
            profile_plugin::INTERNAL_NAME,
            profile_plugin::WORKING_PLUGIN_ID,
            profile_plugin::IS_ENABLED,
        ],
    )
    .exact()
    .constructible()
    .nested_in(&names.profile_model)
}

pub fn repo_settings(names: &TypeNames) -> SchemaContract {
    SchemaContract::new(
        &names.repo_settings,
        [repo_settings::URL, repo_settings::IS_ENABLED, repo_settings::NAME],
    )
    .exact()
    .constructible()
}

/// Every contract, in resolution order.
pub fn all(names: &TypeNames) -> Vec<SchemaContract> {
    vec![
        local_manifest(names),
        configuration(names),
        profile_model(names),
        profile_plugin(names),
        repo_settings(names),
    ]
}
