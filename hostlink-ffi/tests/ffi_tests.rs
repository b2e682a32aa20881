mod common;

use std::collections::HashSet;
use std::ffi::CString;
use std::ptr;
use std::sync::Arc;

use hostlink_bridge::SerializerModule;
use hostlink_ffi::{
    CallStatus, hostlink_fill_out_manifest, hostlink_initialize, hostlink_is_path_valid,
    hostlink_last_error, hostlink_make_plugin_entry, hostlink_make_repository_entry,
    hostlink_register_allocator, hostlink_state, runtime,
};
use hostlink_installer::reference::{reference_host, reference_serializer};
use hostlink_installer::{Installer, InstallerConfig};
use hostlink_model::{
    FieldDescriptor, FieldValue, HostCallError, HostModule, HostObject, MemoryHost, TypeDescriptor,
};
use pretty_assertions::assert_eq;
use serde_json::Value;
use serial_test::serial;

unsafe extern "C" fn copy_to_c_string(data: *const u8, len: usize) -> *mut u8 {
    let bytes = unsafe { std::slice::from_raw_parts(data, len) }.to_vec();
    match CString::new(bytes) {
        Ok(s) => s.into_raw().cast(),
        Err(_) => ptr::null_mut(),
    }
}

unsafe extern "C" fn refuse(_data: *const u8, _len: usize) -> *mut u8 {
    ptr::null_mut()
}

fn take(buffer: *mut u8) -> String {
    assert!(!buffer.is_null());
    unsafe { CString::from_raw(buffer.cast()) }.into_string().unwrap()
}

/// Panics when asked to store the text "trip".
struct Tripwire(MemoryHost);

impl HostModule for Tripwire {
    fn module_name(&self) -> &str {
        self.0.module_name()
    }

    fn find_type(&self, full_name: &str) -> Option<TypeDescriptor> {
        self.0.find_type(full_name)
    }

    fn find_nested_type(&self, parent: &TypeDescriptor, name: &str) -> Option<TypeDescriptor> {
        self.0.find_nested_type(parent, name)
    }

    fn construct(&self, ty: &TypeDescriptor) -> Result<HostObject, HostCallError> {
        self.0.construct(ty)
    }

    fn type_of(&self, object: &HostObject) -> Option<String> {
        self.0.type_of(object)
    }

    fn read_field(&self, object: &HostObject, field: &FieldDescriptor) -> Result<FieldValue, HostCallError> {
        self.0.read_field(object, field)
    }

    fn write_field(
        &self,
        object: &HostObject,
        field: &FieldDescriptor,
        value: FieldValue,
    ) -> Result<(), HostCallError> {
        if value == FieldValue::from("trip") {
            panic!("tripwire hit");
        }
        self.0.write_field(object, field, value)
    }

    fn read_static(&self, symbol: &str) -> Option<HostObject> {
        self.0.read_static(symbol)
    }
}

/// Fresh runtime with the reference installer and a working allocator.
fn ready_runtime() {
    runtime::reset();
    let config = InstallerConfig::default();
    let host: Arc<dyn HostModule> = Arc::new(Tripwire(reference_host(&config)));
    let serializer: Arc<dyn SerializerModule> = Arc::new(reference_serializer(host.clone(), &config));
    runtime::install(Installer::from_modules(host, serializer, &config).unwrap());
    assert_eq!(hostlink_register_allocator(Some(copy_to_c_string)), 0);
}

fn repository_entry(url: &str) -> (*mut u8, u8) {
    let mut status = 0xAA;
    let out = unsafe { hostlink_make_repository_entry(url.as_ptr(), url.len(), &mut status) };
    (out, status)
}

fn plugin_entry(name: &str, working_id: &str) -> (*mut u8, u8) {
    let mut status = 0xAA;
    let out = unsafe {
        hostlink_make_plugin_entry(
            name.as_ptr(),
            name.len(),
            working_id.as_ptr(),
            working_id.len(),
            &mut status,
        )
    };
    (out, status)
}

fn fill_out(manifest: &str, working_id: &str, url: &str) -> (u8, *mut u8, *mut u8) {
    let mut out_manifest = ptr::null_mut();
    let mut out_version = ptr::null_mut();
    let status = unsafe {
        hostlink_fill_out_manifest(
            manifest.as_ptr(),
            manifest.len(),
            working_id.as_ptr(),
            working_id.len(),
            url.as_ptr(),
            url.len(),
            &mut out_manifest,
            &mut out_version,
        )
    };
    (status, out_manifest, out_version)
}

fn last_error() -> Option<String> {
    let mut status = 0xAA;
    let out = unsafe { hostlink_last_error(&mut status) };
    assert_eq!(status, CallStatus::Ok.code());
    (!out.is_null()).then(|| take(out))
}

fn path_verdict(path: &str) -> u8 {
    unsafe { hostlink_is_path_valid(path.as_ptr(), path.len()) }
}

// ── Lifecycle ────────────────────────────────────────────────────

#[test]
#[serial]
fn calls_before_initialization_are_not_ready() {
    runtime::reset();
    assert_eq!(hostlink_register_allocator(Some(copy_to_c_string)), 0);
    assert_eq!(hostlink_state(), runtime::STATE_UNINITIALIZED);

    let (out, status) = repository_entry("u");
    assert!(out.is_null());
    assert_eq!(status, CallStatus::NotReady.code());
    assert_eq!(path_verdict("."), 0xFF);
    assert!(last_error().unwrap().contains("not ready"));
}

#[test]
#[serial]
fn failed_initialization_is_terminal_until_retried() {
    ready_runtime();
    let dir = tempfile::tempdir().unwrap();
    let host = dir.path().join("missing-host.so");
    let host = host.to_str().unwrap();
    let serializer = "missing-serializer.so";

    let ok = unsafe {
        hostlink_initialize(
            host.as_ptr(),
            host.len(),
            ptr::null(),
            0,
            serializer.as_ptr(),
            serializer.len(),
        )
    };

    assert_eq!(ok, 0);
    assert_eq!(hostlink_state(), runtime::STATE_FAILED);
    assert!(last_error().unwrap().contains("missing-host.so"));
    let (out, status) = repository_entry("u");
    assert!(out.is_null());
    assert_eq!(status, CallStatus::NotReady.code());

    ready_runtime();
    assert_eq!(hostlink_state(), runtime::STATE_READY);
}

#[test]
#[serial]
fn initialization_rejects_null_dependency_list() {
    runtime::reset();
    assert_eq!(hostlink_register_allocator(Some(copy_to_c_string)), 0);
    let host = "host.so";
    let ok = unsafe { hostlink_initialize(host.as_ptr(), host.len(), ptr::null(), 2, ptr::null(), 0) };
    assert_eq!(ok, 0);
    assert_eq!(hostlink_state(), runtime::STATE_FAILED);
    assert!(last_error().unwrap().contains("dependency list"));
}

#[test]
#[serial]
fn initialization_over_a_native_host_becomes_ready() {
    runtime::reset();
    assert_eq!(hostlink_register_allocator(Some(copy_to_c_string)), 0);
    let library = common::fixture_library().to_str().unwrap();

    let ok = unsafe {
        hostlink_initialize(
            library.as_ptr(),
            library.len(),
            ptr::null(),
            0,
            library.as_ptr(),
            library.len(),
        )
    };

    assert_eq!(ok, 1);
    assert_eq!(hostlink_state(), runtime::STATE_READY);
    let (out, status) = repository_entry("https://example.com/repo.json");
    assert_eq!(status, CallStatus::Ok.code());
    let entry: Value = serde_json::from_str(&take(out)).unwrap();
    assert_eq!(
        entry["$type"],
        "Dalamud.Configuration.ThirdPartyRepoSettings, Dalamud"
    );
    assert_eq!(entry["Url"], "https://example.com/repo.json");

    let (status, manifest, version) = fill_out(MANIFEST, WORKING_ID, "u");
    assert_eq!(status, CallStatus::Ok.code());
    assert!(take(manifest).contains(WORKING_ID));
    assert_eq!(take(version), "1.2.3.4");
    runtime::reset();
}

// ── Allocator ────────────────────────────────────────────────────

#[test]
#[serial]
fn missing_allocator_is_reported() {
    ready_runtime();
    assert_eq!(hostlink_register_allocator(None), 0);

    let (out, status) = repository_entry("u");
    assert!(out.is_null());
    assert_eq!(status, CallStatus::NoAllocator.code());
}

#[test]
#[serial]
fn refusing_allocator_is_reported() {
    ready_runtime();
    assert_eq!(hostlink_register_allocator(Some(refuse)), 0);

    let (out, status) = repository_entry("u");
    assert!(out.is_null());
    assert_eq!(status, CallStatus::NoAllocator.code());
}

// ── Entries ──────────────────────────────────────────────────────

#[test]
#[serial]
fn repository_entry_crosses_the_boundary() {
    ready_runtime();
    let (out, status) = repository_entry("https://example.com/repo.json");
    assert_eq!(status, CallStatus::Ok.code());

    let entry: Value = serde_json::from_str(&take(out)).unwrap();
    assert_eq!(entry["Url"], "https://example.com/repo.json");
    assert_eq!(entry["IsEnabled"], true);
    assert_eq!(entry["Name"], Value::Null);
}

#[test]
#[serial]
fn null_input_with_length_is_invalid() {
    ready_runtime();
    let mut status = 0xAA;
    let out = unsafe { hostlink_make_repository_entry(ptr::null(), 4, &mut status) };
    assert!(out.is_null());
    assert_eq!(status, CallStatus::InvalidInput.code());
}

#[test]
#[serial]
fn invalid_utf8_is_invalid_input() {
    ready_runtime();
    let bytes = [0x68, 0xc3, 0x28];
    let mut status = 0xAA;
    let out = unsafe { hostlink_make_repository_entry(bytes.as_ptr(), bytes.len(), &mut status) };
    assert!(out.is_null());
    assert_eq!(status, CallStatus::InvalidInput.code());
}

#[test]
#[serial]
fn plugin_entry_keeps_given_working_id() {
    ready_runtime();
    let id = "0f8e37a4-1f0c-4c8e-9d6a-3b7e2f1c5a90";
    let (out, status) = plugin_entry("sample-plugin", id);
    assert_eq!(status, CallStatus::Ok.code());

    let entry: Value = serde_json::from_str(&take(out)).unwrap();
    assert_eq!(entry["WorkingPluginId"], id);
    assert_eq!(entry["InternalName"], "sample-plugin");
}

#[test]
#[serial]
fn empty_working_ids_are_fresh_each_time() {
    ready_runtime();
    let mut seen = HashSet::new();
    for _ in 0..200 {
        let (out, status) = plugin_entry("sample-plugin", "");
        assert_eq!(status, CallStatus::Ok.code());
        let entry: Value = serde_json::from_str(&take(out)).unwrap();
        let id = entry["WorkingPluginId"].as_str().unwrap().to_string();
        assert!(seen.insert(id));
    }
}

#[test]
#[serial]
fn bad_working_id_is_invalid_input() {
    ready_runtime();
    let (out, status) = plugin_entry("sample-plugin", "not-a-guid");
    assert!(out.is_null());
    assert_eq!(status, CallStatus::InvalidInput.code());
    assert!(last_error().unwrap().contains("not-a-guid"));
}

// ── Manifests ────────────────────────────────────────────────────

const MANIFEST: &str = r#"{"InternalName":"sample-plugin","AssemblyVersion":"1.2.3.4"}"#;
const WORKING_ID: &str = "5d2f4a3e-8c1b-4f7a-9e6d-0a1b2c3d4e5f";

#[test]
#[serial]
fn fill_out_returns_manifest_and_version() {
    ready_runtime();
    let (status, manifest, version) = fill_out(MANIFEST, WORKING_ID, "https://example.com/repo.json");
    assert_eq!(status, CallStatus::Ok.code());

    let manifest: Value = serde_json::from_str(&take(manifest)).unwrap();
    assert_eq!(manifest["WorkingPluginId"], WORKING_ID);
    assert_eq!(manifest["InstalledFromUrl"], "https://example.com/repo.json");
    assert_eq!(take(version), "1.2.3.4");
}

#[test]
#[serial]
fn fill_out_without_version_leaves_outputs_null() {
    ready_runtime();
    let (status, manifest, version) = fill_out(r#"{"InternalName":"x"}"#, WORKING_ID, "u");
    assert_eq!(status, CallStatus::Failed.code());
    assert!(manifest.is_null());
    assert!(version.is_null());
    assert!(last_error().unwrap().contains("assembly version"));
}

#[test]
#[serial]
fn fill_out_rejects_malformed_json() {
    ready_runtime();
    let (status, manifest, version) = fill_out("{", WORKING_ID, "u");
    assert_eq!(status, CallStatus::Failed.code());
    assert!(manifest.is_null() && version.is_null());
}

// ── Panics ───────────────────────────────────────────────────────

#[test]
#[serial]
fn panic_inside_a_call_is_contained() {
    ready_runtime();
    let (out, status) = repository_entry("trip");
    assert!(out.is_null());
    assert_eq!(status, CallStatus::Panicked.code());
    assert!(last_error().unwrap().contains("tripwire hit"));

    let (out, status) = repository_entry("fine");
    assert_eq!(status, CallStatus::Ok.code());
    take(out);
}

// ── Paths ────────────────────────────────────────────────────────

#[test]
#[serial]
fn path_validity_is_tri_state() {
    ready_runtime();
    let dir = tempfile::tempdir().unwrap();
    let mods = dir.path().join("mods");
    std::fs::create_dir(&mods).unwrap();

    assert_eq!(path_verdict(mods.to_str().unwrap()), 1);
    assert_eq!(path_verdict(dir.path().join("absent").to_str().unwrap()), 0);
    assert_eq!(path_verdict(""), 0xFF);
    assert_eq!(unsafe { hostlink_is_path_valid(ptr::null(), 3) }, 0xFF);
}

#[cfg(all(unix, not(target_os = "macos")))]
#[test]
#[serial]
fn system_directories_are_rejected() {
    ready_runtime();
    assert_eq!(path_verdict("/usr"), 0);
    assert_eq!(path_verdict("/usr/share/doc"), 0);
}
