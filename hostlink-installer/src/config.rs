//! Installer configuration, read from `config.toml`.
//!
//! Every section is optional. A missing file runs with defaults; a file that
//! cannot be read or parsed is logged and also falls back to defaults, so a
//! bad edit never keeps the installer from starting.

use std::path::{Path, PathBuf};

use hostlink_bridge::EntryPoints;
use hostlink_paths::PathValidator;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{InstallerError, InstallerResult};

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "HOSTLINK_CONFIG";

/// Full names of the host types the installer works with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeNames {
    pub local_manifest: String,
    pub configuration: String,
    pub profile_model: String,
    /// Simple name, declared inside `profile_model`.
    pub profile_plugin: String,
    pub repo_settings: String,
}

impl Default for TypeNames {
    fn default() -> Self {
        Self {
            local_manifest: "Dalamud.Plugin.Internal.Types.Manifest.LocalPluginManifest".to_string(),
            configuration: "Dalamud.Configuration.Internal.DalamudConfiguration".to_string(),
            profile_model: "Dalamud.Plugin.Internal.Profiles.ProfileModelV1".to_string(),
            profile_plugin: "ProfileModelV1Plugin".to_string(),
            repo_settings: "Dalamud.Configuration.ThirdPartyRepoSettings".to_string(),
        }
    }
}

/// Which directories the path check protects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathPolicy {
    pub extra_protected_roots: Vec<PathBuf>,
    pub include_system_roots: bool,
}

impl Default for PathPolicy {
    fn default() -> Self {
        Self {
            extra_protected_roots: Vec::new(),
            include_system_roots: true,
        }
    }
}

impl PathPolicy {
    pub fn validator(&self) -> PathValidator {
        let mut validator = if self.include_system_roots {
            PathValidator::system()
        } else {
            PathValidator::default()
        };
        for root in &self.extra_protected_roots {
            validator.add_root(root.clone());
        }
        validator
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    pub types: TypeNames,
    pub serializer: EntryPoints,
    pub paths: PathPolicy,
}

impl InstallerConfig {
    /// Loads from `$HOSTLINK_CONFIG`, or `<config dir>/hostlink/config.toml`.
    pub fn load() -> Self {
        match default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                info!("No configuration directory available, using defaults");
                Self::default()
            }
        }
    }

    /// Loads from an explicit path, falling back to defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!("No config file found at {:?}, using defaults", path);
            return Self::default();
        }
        match Self::try_load_from(path) {
            Ok(config) => {
                info!("Loaded installer config from {:?}", path);
                config
            }
            Err(e) => {
                warn!("{}. Falling back to defaults.", e);
                Self::default()
            }
        }
    }

    /// Loads from an explicit path, reporting any failure.
    pub fn try_load_from(path: &Path) -> InstallerResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| InstallerError::io(path, e))?;
        Self::from_toml_str(&contents).map_err(|e| InstallerError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}

fn default_path() -> Option<PathBuf> {
    if let Some(explicit) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(explicit));
    }
    dirs::config_dir().map(|dir| dir.join("hostlink").join("config.toml"))
}
