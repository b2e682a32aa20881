//! The process-wide installer and its lifecycle.
//!
//! `Uninitialized` until the first initialization, then `Ready` or `Failed`
//! depending on how the most recent one went. Operations clone the ready
//! installer out of the lock and run without holding it.

use std::sync::{Arc, Mutex, PoisonError};

use hostlink_host::ModulePaths;
use hostlink_installer::{Installer, InstallerConfig};
use tracing::{error, info};

use crate::error::{FfiError, FfiResult};

pub const STATE_UNINITIALIZED: u8 = 0;
pub const STATE_READY: u8 = 1;
pub const STATE_FAILED: u8 = 2;

enum RuntimeState {
    Uninitialized,
    Ready(Arc<Installer>),
    Failed(String),
}

static RUNTIME: Mutex<RuntimeState> = Mutex::new(RuntimeState::Uninitialized);

static LAST_ERROR: Mutex<Option<String>> = Mutex::new(None);

fn set_state(state: RuntimeState) {
    *RUNTIME.lock().unwrap_or_else(PoisonError::into_inner) = state;
}

/// Loads the modules at `paths` and replaces the current installer. On
/// failure the caller decides how the state is recorded.
pub fn initialize(paths: &ModulePaths) -> FfiResult<()> {
    let config = InstallerConfig::load();
    install(Installer::load(paths, &config)?);
    Ok(())
}

/// Makes `installer` the ready installer.
pub fn install(installer: Installer) {
    set_state(RuntimeState::Ready(Arc::new(installer)));
    info!("runtime ready");
}

pub fn mark_failed(reason: String) {
    error!(%reason, "initialization failed");
    set_state(RuntimeState::Failed(reason));
}

/// Back to `Uninitialized`, dropping any installer.
pub fn reset() {
    set_state(RuntimeState::Uninitialized);
    *LAST_ERROR.lock().unwrap_or_else(PoisonError::into_inner) = None;
}

pub fn ready() -> FfiResult<Arc<Installer>> {
    match &*RUNTIME.lock().unwrap_or_else(PoisonError::into_inner) {
        RuntimeState::Ready(installer) => Ok(installer.clone()),
        RuntimeState::Uninitialized => Err(FfiError::NotReady("not initialized".to_string())),
        RuntimeState::Failed(reason) => Err(FfiError::NotReady(format!(
            "initialization failed: {reason}"
        ))),
    }
}

pub fn state_code() -> u8 {
    match &*RUNTIME.lock().unwrap_or_else(PoisonError::into_inner) {
        RuntimeState::Uninitialized => STATE_UNINITIALIZED,
        RuntimeState::Ready(_) => STATE_READY,
        RuntimeState::Failed(_) => STATE_FAILED,
    }
}

pub fn record_error(message: String) {
    *LAST_ERROR.lock().unwrap_or_else(PoisonError::into_inner) = Some(message);
}

pub fn last_error() -> Option<String> {
    LAST_ERROR
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}
