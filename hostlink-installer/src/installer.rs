use std::path::{Path, PathBuf};
use std::sync::Arc;

use hostlink_bridge::{Formatting, SerializerBinding, SerializerModule};
use hostlink_host::{ModulePaths, ModuleSet};
use hostlink_model::{FieldValue, HostModule, ObjectBuilder, ResolvedType, TypeRegistry};
use hostlink_paths::{PathValidator, PathVerdict};
use hostlink_types::{AssemblyVersion, WorkingId};
use tracing::{debug, info, warn};

use crate::collab::{FetchedPlugin, ModDirectoryStore, PluginFetcher};
use crate::config::InstallerConfig;
use crate::contracts::{self, manifest, profile_plugin, repo_settings};
use crate::error::{InstallerError, InstallerResult};

/// A profile plugin entry and the working id written into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginEntry {
    pub json: String,
    pub working_id: WorkingId,
}

/// A manifest with the installer's fields filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilledManifest {
    pub json: String,
    pub version: AssemblyVersion,
}

/// Everything produced by installing one plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPlugin {
    pub manifest: FilledManifest,
    pub profile_entry: PluginEntry,
}

/// The host types, their builder and the host's serializer, resolved and
/// verified once.
///
/// Construction fails if any contract does not hold or the serializer
/// cannot be bound; after that every operation works on handles that are
/// known to match the host.
pub struct Installer {
    builder: ObjectBuilder,
    binding: SerializerBinding,
    validator: PathValidator,
    local_manifest: ResolvedType,
    configuration: ResolvedType,
    profile_model: ResolvedType,
    profile_plugin: ResolvedType,
    repo_settings: ResolvedType,
}

impl Installer {
    /// Loads the native modules and builds an installer over them.
    pub fn load(paths: &ModulePaths, config: &InstallerConfig) -> InstallerResult<Self> {
        let modules = ModuleSet::load(paths)?;
        let host: Arc<dyn HostModule> = modules.host;
        let serializer: Arc<dyn SerializerModule> = modules.serializer;
        Self::from_modules(host, serializer, config)
    }

    pub fn from_modules(
        host: Arc<dyn HostModule>,
        serializer: Arc<dyn SerializerModule>,
        config: &InstallerConfig,
    ) -> InstallerResult<Self> {
        let names = &config.types;
        let mut registry = TypeRegistry::new(host.clone());
        let local_manifest = registry.resolve(&contracts::local_manifest(names))?;
        let configuration = registry.resolve(&contracts::configuration(names))?;
        let profile_model = registry.resolve(&contracts::profile_model(names))?;
        let profile_plugin = registry.resolve(&contracts::profile_plugin(names))?;
        let repo_settings = registry.resolve(&contracts::repo_settings(names))?;

        let binding = SerializerBinding::locate(serializer, host.as_ref(), &config.serializer)?;

        info!(
            host = %host.module_name(),
            serializer = %binding.module_name(),
            "installer ready"
        );
        Ok(Self {
            builder: ObjectBuilder::new(host),
            binding,
            validator: config.paths.validator(),
            local_manifest,
            configuration,
            profile_model,
            profile_plugin,
            repo_settings,
        })
    }

    pub fn local_manifest_type(&self) -> &ResolvedType {
        &self.local_manifest
    }

    /// Resolved so drift in the host's configuration type fails
    /// initialization; no operation writes it.
    pub fn configuration_type(&self) -> &ResolvedType {
        &self.configuration
    }

    /// Resolved for drift detection and as the parent of the profile plugin
    /// type; no operation writes it.
    pub fn profile_model_type(&self) -> &ResolvedType {
        &self.profile_model
    }

    pub fn profile_plugin_type(&self) -> &ResolvedType {
        &self.profile_plugin
    }

    pub fn repo_settings_type(&self) -> &ResolvedType {
        &self.repo_settings
    }

    pub fn builder(&self) -> &ObjectBuilder {
        &self.builder
    }

    pub fn binding(&self) -> &SerializerBinding {
        &self.binding
    }

    pub fn validator(&self) -> &PathValidator {
        &self.validator
    }

    /// An enabled, unnamed third-party repository entry for `url`, encoded
    /// the way the host writes its configuration.
    pub fn make_repository_entry(&self, url: &str) -> InstallerResult<String> {
        let ty = &self.repo_settings;
        let repo = self.builder.create(ty.handle())?;
        self.builder
            .set_field(&repo, ty.field(repo_settings::NAME)?, FieldValue::Null)?;
        self.builder
            .set_field(&repo, ty.field(repo_settings::URL)?, url.into())?;
        self.builder
            .set_field(&repo, ty.field(repo_settings::IS_ENABLED)?, true.into())?;

        let json = self.binding.encode(&repo, ty.handle(), None)?;
        debug!(url, "made repository entry");
        Ok(json)
    }

    /// An enabled profile entry for the plugin `internal_name`. A fresh
    /// working id is generated when none is given.
    pub fn make_plugin_entry(
        &self,
        internal_name: &str,
        working_id: Option<WorkingId>,
    ) -> InstallerResult<PluginEntry> {
        let working_id = working_id.unwrap_or_default();
        let ty = &self.profile_plugin;
        let plugin = self.builder.create(ty.handle())?;
        self.builder.set_field(
            &plugin,
            ty.field(profile_plugin::INTERNAL_NAME)?,
            internal_name.into(),
        )?;
        self.builder.set_field(
            &plugin,
            ty.field(profile_plugin::WORKING_PLUGIN_ID)?,
            working_id.as_uuid().into(),
        )?;
        self.builder
            .set_field(&plugin, ty.field(profile_plugin::IS_ENABLED)?, true.into())?;

        let json = self.binding.encode(&plugin, ty.handle(), None)?;
        debug!(internal_name, %working_id, "made plugin entry");
        Ok(PluginEntry { json, working_id })
    }

    /// Stamps a plugin's manifest with its working id and source url,
    /// re-encoded compactly with plain options.
    pub fn fill_out_manifest(
        &self,
        manifest_json: &str,
        working_id: WorkingId,
        source_url: &str,
    ) -> InstallerResult<FilledManifest> {
        self.fill_out_manifest_with(manifest_json, working_id, source_url, Formatting::None)
    }

    pub fn fill_out_manifest_with(
        &self,
        manifest_json: &str,
        working_id: WorkingId,
        source_url: &str,
        formatting: Formatting,
    ) -> InstallerResult<FilledManifest> {
        let ty = &self.local_manifest;
        let plain = self.binding.plain_options()?;
        let instance = self.binding.decode(manifest_json, ty.handle(), Some(&plain))?;

        self.builder.set_field(
            &instance,
            ty.field(manifest::WORKING_PLUGIN_ID)?,
            working_id.as_uuid().into(),
        )?;
        self.builder.set_field(
            &instance,
            ty.field(manifest::INSTALLED_FROM_URL)?,
            source_url.into(),
        )?;

        let version = self
            .builder
            .get_field(&instance, ty.field(manifest::ASSEMBLY_VERSION)?)?
            .as_version()
            .ok_or_else(|| InstallerError::MissingVersion {
                type_name: ty.full_name().to_string(),
            })?;

        let options = self.binding.with_formatting(&plain, formatting)?;
        let json = self.binding.encode(&instance, ty.handle(), Some(&options))?;
        debug!(%working_id, %version, "filled out manifest");
        Ok(FilledManifest { json, version })
    }

    pub fn check_path(&self, path: &Path) -> PathVerdict {
        self.validator.check(path)
    }

    /// Fills out a fetched plugin's manifest and writes the indented result
    /// next to the extracted files.
    pub fn fill_out_fetched(
        &self,
        fetched: &FetchedPlugin,
        working_id: WorkingId,
        source_url: &str,
    ) -> InstallerResult<FilledManifest> {
        let text = std::str::from_utf8(&fetched.manifest).map_err(|e| {
            InstallerError::InvalidInput(format!(
                "manifest of {} is not UTF-8: {e}",
                fetched.internal_name
            ))
        })?;
        let filled = self.fill_out_manifest_with(text, working_id, source_url, Formatting::Indented)?;

        let path = fetched.manifest_path();
        std::fs::write(&path, &filled.json).map_err(|e| InstallerError::io(&path, e))?;
        info!(
            plugin = %fetched.internal_name,
            version = %filled.version,
            path = %path.display(),
            "wrote plugin manifest"
        );
        Ok(filled)
    }

    /// Fetches a plugin, fills out its manifest under a fresh working id and
    /// makes the profile entry that enables it.
    pub fn install_plugin(
        &self,
        fetcher: &dyn PluginFetcher,
        download_url: &str,
        internal_name: &str,
        source_url: &str,
    ) -> InstallerResult<InstalledPlugin> {
        let fetched = fetcher.fetch(download_url, internal_name)?;
        let working_id = WorkingId::new();
        let manifest = self.fill_out_fetched(&fetched, working_id, source_url)?;
        let profile_entry = self.make_plugin_entry(internal_name, Some(working_id))?;
        Ok(InstalledPlugin {
            manifest,
            profile_entry,
        })
    }

    /// The stored mod directory, if it is still usable. A stored directory
    /// that has gone missing is recreated.
    pub fn stored_mod_directory(
        &self,
        store: &dyn ModDirectoryStore,
    ) -> InstallerResult<Option<PathBuf>> {
        let Some(stored) = store.load()? else {
            return Ok(None);
        };
        let verdict = self.validator.prepare(&stored);
        if verdict.is_acceptable() {
            debug!(path = %stored.display(), "keeping stored mod directory");
            Ok(Some(stored))
        } else {
            warn!(path = %stored.display(), %verdict, "stored mod directory is unusable");
            Ok(None)
        }
    }

    /// Creates `candidate` if needed and persists it as the mod directory if
    /// the path check accepts it. The verdict is returned either way.
    pub fn choose_mod_directory(
        &self,
        store: &mut dyn ModDirectoryStore,
        candidate: &Path,
    ) -> InstallerResult<PathVerdict> {
        let verdict = self.validator.prepare(candidate);
        if verdict.is_acceptable() {
            store.persist(candidate)?;
            info!(path = %candidate.display(), "mod directory chosen");
        } else {
            warn!(path = %candidate.display(), %verdict, "mod directory refused");
        }
        Ok(verdict)
    }
}
