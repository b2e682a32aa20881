use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::error::HostResult;
use crate::native::{NativeHost, NativeSerializer};

/// Where the host, its dependencies and its serializer live on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModulePaths {
    pub host: PathBuf,
    /// Loaded in order, before the host.
    pub dependencies: Vec<PathBuf>,
    pub serializer: PathBuf,
}

/// The native modules one installer talks to.
pub struct ModuleSet {
    pub host: Arc<NativeHost>,
    pub serializer: Arc<NativeSerializer>,
}

impl ModuleSet {
    /// Loads every module or none: a failure drops whatever was already
    /// loaded.
    pub fn load(paths: &ModulePaths) -> HostResult<Self> {
        let host = Arc::new(NativeHost::load(&paths.host, &paths.dependencies)?);
        let serializer = Arc::new(NativeSerializer::load(&paths.serializer, host.clone())?);
        info!(
            host = %paths.host.display(),
            dependencies = paths.dependencies.len(),
            serializer = %paths.serializer.display(),
            "loaded native modules"
        );
        Ok(Self { host, serializer })
    }
}
