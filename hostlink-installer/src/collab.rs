//! Collaborators the installer drives but does not implement.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{InstallerError, InstallerResult};

/// A plugin archive, downloaded and extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPlugin {
    pub internal_name: String,
    pub extracted_dir: PathBuf,
    /// Raw bytes of `<internal_name>.json` from the archive.
    pub manifest: Vec<u8>,
}

impl FetchedPlugin {
    /// Where the host expects the filled-out manifest.
    pub fn manifest_path(&self) -> PathBuf {
        self.extracted_dir.join(format!("{}.json", self.internal_name))
    }
}

/// Downloads a plugin archive and extracts it where the host loads plugins
/// from.
pub trait PluginFetcher {
    fn fetch(&self, download_url: &str, internal_name: &str) -> InstallerResult<FetchedPlugin>;
}

/// Persists the user's chosen mod directory.
pub trait ModDirectoryStore {
    fn load(&self) -> InstallerResult<Option<PathBuf>>;

    fn persist(&mut self, directory: &Path) -> InstallerResult<()>;
}

const MOD_DIRECTORY_KEY: &str = "ModDirectory";

/// A JSON configuration file whose `ModDirectory` member holds the
/// directory. Other members are kept as they are.
#[derive(Debug, Clone)]
pub struct JsonModDirectoryStore {
    path: PathBuf,
}

impl JsonModDirectoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_object(&self) -> InstallerResult<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let contents =
            std::fs::read_to_string(&self.path).map_err(|e| InstallerError::io(&self.path, e))?;
        let contents = hostlink_bridge::strip_bom(&contents);
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(contents)? {
            Value::Object(object) => Ok(object),
            _ => Err(InstallerError::InvalidInput(format!(
                "{} does not hold a JSON object",
                self.path.display()
            ))),
        }
    }
}

impl ModDirectoryStore for JsonModDirectoryStore {
    fn load(&self) -> InstallerResult<Option<PathBuf>> {
        let object = self.read_object()?;
        Ok(object
            .get(MOD_DIRECTORY_KEY)
            .and_then(Value::as_str)
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from))
    }

    fn persist(&mut self, directory: &Path) -> InstallerResult<()> {
        let mut object = self.read_object()?;
        object.insert(
            MOD_DIRECTORY_KEY.to_string(),
            Value::String(directory.to_string_lossy().into_owned()),
        );
        let json = serde_json::to_string_pretty(&Value::Object(object))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| InstallerError::io(parent, e))?;
        }
        std::fs::write(&self.path, json).map_err(|e| InstallerError::io(&self.path, e))?;
        debug!(path = %self.path.display(), "persisted mod directory");
        Ok(())
    }
}
