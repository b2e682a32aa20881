//! C ABI exports for the hostlink installer.
//!
//! All text crosses the boundary as UTF-8 pointer + length pairs. Output
//! text is copied into caller-owned memory by the allocator registered with
//! [`hostlink_register_allocator`]. Every export contains panics and reports
//! failures as status bytes; the message of the most recent failure is
//! available from [`hostlink_last_error`].

pub mod buffer;
mod error;
pub mod logging;
pub mod runtime;
mod status;

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::ptr;

use hostlink_host::ModulePaths;
use hostlink_host::abi::AbiStr;
use hostlink_paths::PathVerdict;
use hostlink_types::WorkingId;
use tracing::warn;

pub use buffer::AllocatorFn;
pub use error::{FfiError, FfiResult};
pub use status::CallStatus;

use crate::buffer::{read_str, write_output};

/// Runs one export body, containing panics. Failures are logged and, when
/// `record` is set, kept for [`hostlink_last_error`].
fn contain<T>(
    call: &'static str,
    record: bool,
    body: impl FnOnce() -> FfiResult<T>,
) -> Result<T, CallStatus> {
    let (status, message) = match catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(value)) => return Ok(value),
        Ok(Err(e)) => (e.status(), e.to_string()),
        Err(payload) => (CallStatus::Panicked, format!("panicked: {}", panic_message(&*payload))),
    };
    warn!(call, status = status.code(), %message, "call failed");
    if record {
        runtime::record_error(format!("{call}: {message}"));
    }
    Err(status)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}

/// # Safety
/// `out` must be null or valid for a one-byte write.
unsafe fn write_status(out: *mut u8, status: CallStatus) {
    if !out.is_null() {
        unsafe { out.write(status.code()) };
    }
}

fn parse_working_id(text: &str) -> FfiResult<WorkingId> {
    WorkingId::parse(text)
        .map_err(|e| FfiError::InvalidInput(format!("working id {text:?}: {e}")))
}

/// Registers the allocator used for every output buffer. Null clears it.
///
/// Returns a [`CallStatus`] code.
#[unsafe(no_mangle)]
pub extern "C" fn hostlink_register_allocator(allocator: Option<AllocatorFn>) -> u8 {
    match contain("hostlink_register_allocator", true, || {
        buffer::register_allocator(allocator);
        Ok(())
    }) {
        Ok(()) => CallStatus::Ok.code(),
        Err(status) => status.code(),
    }
}

/// Loads the host module, its dependencies and its serializer, and builds
/// the installer over them, replacing any previous one.
///
/// Returns `1` when ready and `0` on failure.
///
/// # Safety
/// Every pointer must be null (with a zero length or count) or valid for
/// its length. `dependencies` points at `dependency_count` [`AbiStr`]s.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hostlink_initialize(
    host: *const u8,
    host_len: usize,
    dependencies: *const AbiStr,
    dependency_count: usize,
    serializer: *const u8,
    serializer_len: usize,
) -> u8 {
    logging::init();
    let outcome = contain("hostlink_initialize", true, || {
        let host = unsafe { read_str(host, host_len, "host path") }?;
        let serializer = unsafe { read_str(serializer, serializer_len, "serializer path") }?;
        let dependencies = unsafe { read_dependencies(dependencies, dependency_count) }?;
        let paths = ModulePaths {
            host: PathBuf::from(host),
            dependencies,
            serializer: PathBuf::from(serializer),
        };
        runtime::initialize(&paths)
    });
    match outcome {
        Ok(()) => 1,
        Err(_) => {
            runtime::mark_failed(runtime::last_error().unwrap_or_default());
            0
        }
    }
}

/// # Safety
/// `dependencies` must be null or valid for `count` entries, each valid for
/// its length.
unsafe fn read_dependencies(dependencies: *const AbiStr, count: usize) -> FfiResult<Vec<PathBuf>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    if dependencies.is_null() {
        return Err(FfiError::InvalidInput(format!(
            "dependency list is null with count {count}"
        )));
    }
    let entries = unsafe { std::slice::from_raw_parts(dependencies, count) };
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            unsafe { read_str(entry.ptr, entry.len, &format!("dependency {i}")) }.map(PathBuf::from)
        })
        .collect()
}

/// Builds an enabled third-party repository entry for `url`.
///
/// Returns a caller-owned buffer, or null on failure.
///
/// # Safety
/// `url` must be null (with a zero length) or valid for `url_len` bytes.
/// `out_status` must be null or valid for a one-byte write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hostlink_make_repository_entry(
    url: *const u8,
    url_len: usize,
    out_status: *mut u8,
) -> *mut u8 {
    let outcome = contain("hostlink_make_repository_entry", true, || {
        let url = unsafe { read_str(url, url_len, "url") }?;
        let json = runtime::ready()?.make_repository_entry(url)?;
        write_output(&json)
    });
    unsafe { finish(outcome, out_status) }
}

/// Builds an enabled profile entry for a plugin. An empty working id asks
/// for a fresh one.
///
/// Returns a caller-owned buffer, or null on failure.
///
/// # Safety
/// Text pointers must be null (with a zero length) or valid for their
/// lengths. `out_status` must be null or valid for a one-byte write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hostlink_make_plugin_entry(
    internal_name: *const u8,
    internal_name_len: usize,
    working_id: *const u8,
    working_id_len: usize,
    out_status: *mut u8,
) -> *mut u8 {
    let outcome = contain("hostlink_make_plugin_entry", true, || {
        let internal_name = unsafe { read_str(internal_name, internal_name_len, "internal name") }?;
        let working_id = unsafe { read_str(working_id, working_id_len, "working id") }?.trim();
        let working_id = match working_id {
            "" => None,
            text => Some(parse_working_id(text)?),
        };
        let entry = runtime::ready()?.make_plugin_entry(internal_name, working_id)?;
        write_output(&entry.json)
    });
    unsafe { finish(outcome, out_status) }
}

/// Stamps a manifest with a working id and source url.
///
/// On success both outputs receive caller-owned buffers: the compact
/// manifest and its assembly version. On failure both are null.
///
/// Returns a [`CallStatus`] code.
///
/// # Safety
/// Text pointers must be null (with a zero length) or valid for their
/// lengths. `out_manifest` and `out_version` must be valid for a pointer
/// write.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn hostlink_fill_out_manifest(
    manifest: *const u8,
    manifest_len: usize,
    working_id: *const u8,
    working_id_len: usize,
    source_url: *const u8,
    source_url_len: usize,
    out_manifest: *mut *mut u8,
    out_version: *mut *mut u8,
) -> u8 {
    for out in [out_manifest, out_version] {
        if !out.is_null() {
            unsafe { out.write(ptr::null_mut()) };
        }
    }
    let outcome = contain("hostlink_fill_out_manifest", true, || {
        if out_manifest.is_null() || out_version.is_null() {
            return Err(FfiError::InvalidInput("output pointer is null".to_string()));
        }
        let manifest = unsafe { read_str(manifest, manifest_len, "manifest") }?;
        let working_id = parse_working_id(unsafe { read_str(working_id, working_id_len, "working id") }?)?;
        let source_url = unsafe { read_str(source_url, source_url_len, "source url") }?;

        let filled = runtime::ready()?.fill_out_manifest(manifest, working_id, source_url)?;
        let manifest = write_output(&filled.json)?;
        // The manifest buffer already belongs to the caller if this fails.
        let version = write_output(&filled.version.to_string())?;
        Ok((manifest, version))
    });
    match outcome {
        Ok((manifest, version)) => {
            unsafe {
                out_manifest.write(manifest);
                out_version.write(version);
            }
            CallStatus::Ok.code()
        }
        Err(status) => status.code(),
    }
}

/// Checks whether `path` is acceptable as a user-data directory.
///
/// Returns `1` acceptable, `0` rejected, `0xFF` when undecided, not ready,
/// or when the check failed.
///
/// # Safety
/// `path` must be null (with a zero length) or valid for `path_len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hostlink_is_path_valid(path: *const u8, path_len: usize) -> u8 {
    let outcome = contain("hostlink_is_path_valid", true, || {
        let path = unsafe { read_str(path, path_len, "path") }?;
        Ok(runtime::ready()?.check_path(Path::new(path)))
    });
    match outcome {
        Ok(verdict) => verdict.status_byte(),
        Err(_) => PathVerdict::STATUS_INDETERMINATE,
    }
}

/// `0` uninitialized, `1` ready, `2` failed.
#[unsafe(no_mangle)]
pub extern "C" fn hostlink_state() -> u8 {
    runtime::state_code()
}

/// The message of the most recent failure, or null if there was none.
///
/// # Safety
/// `out_status` must be null or valid for a one-byte write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hostlink_last_error(out_status: *mut u8) -> *mut u8 {
    let outcome = contain("hostlink_last_error", false, || match runtime::last_error() {
        Some(message) => write_output(&message),
        None => Ok(ptr::null_mut()),
    });
    unsafe { finish(outcome, out_status) }
}

/// # Safety
/// `out_status` must be null or valid for a one-byte write.
unsafe fn finish(outcome: Result<*mut u8, CallStatus>, out_status: *mut u8) -> *mut u8 {
    match outcome {
        Ok(buffer) => {
            unsafe { write_status(out_status, CallStatus::Ok) };
            buffer
        }
        Err(status) => {
            unsafe { write_status(out_status, status) };
            ptr::null_mut()
        }
    }
}
