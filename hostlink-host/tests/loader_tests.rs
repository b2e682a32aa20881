use std::io::Write;
use std::path::PathBuf;

use hostlink_host::abi::{self, AbiStr, AbiValue, ReadValue};
use hostlink_host::{HostError, ModulePaths, ModuleSet, NativeHost};
use hostlink_model::FieldValue;
use hostlink_types::AssemblyVersion;
use pretty_assertions::assert_eq;
use uuid::Uuid;

fn read(value: &AbiValue) -> FieldValue {
    match unsafe { value.read() }.unwrap() {
        ReadValue::Value(v) => v,
        ReadValue::Object(_) => panic!("unexpected object"),
    }
}

// ── Loading ──────────────────────────────────────────────────────

#[test]
fn missing_host_library_fails_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no-such-host.so");
    let deps: [PathBuf; 0] = [];
    match NativeHost::load(&path, &deps) {
        Err(HostError::ModuleLoadFailed { path: failed, .. }) => assert_eq!(failed, path),
        Err(other) => panic!("unexpected {other:?}"),
        Ok(_) => panic!("loaded a missing library"),
    }
}

#[test]
fn garbage_file_is_not_a_module() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"definitely not a shared library").unwrap();
    let deps: [PathBuf; 0] = [];
    assert!(matches!(
        NativeHost::load(file.path(), &deps),
        Err(HostError::ModuleLoadFailed { .. })
    ));
}

#[test]
fn missing_dependency_fails_before_host() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ModulePaths {
        host: dir.path().join("host.so"),
        dependencies: vec![dir.path().join("dep.so")],
        serializer: dir.path().join("json.so"),
    };
    match ModuleSet::load(&paths) {
        Err(HostError::ModuleLoadFailed { path, .. }) => {
            assert_eq!(path, dir.path().join("dep.so"));
        }
        Err(other) => panic!("unexpected {other:?}"),
        Ok(_) => panic!("loaded missing modules"),
    }
}

// ── Symbols ──────────────────────────────────────────────────────

#[test]
fn entry_names_map_to_c_symbols() {
    assert_eq!(abi::symbol_name("JsonConvert.SerializeObject"), "JsonConvert_SerializeObject");
    assert_eq!(abi::symbol_name("a+b c"), "a_b_c");
    assert_eq!(abi::symbol_name("plain_name9"), "plain_name9");
}

// ── Values ───────────────────────────────────────────────────────

#[test]
fn scalar_values_read_back() {
    let text = String::from("héllo");
    assert_eq!(read(&AbiValue::text(&text)), FieldValue::from("héllo"));
    assert_eq!(read(&AbiValue::boolean(true)), FieldValue::Bool(true));
    assert_eq!(read(&AbiValue::NULL), FieldValue::Null);

    let id = Uuid::new_v4();
    assert_eq!(read(&AbiValue::uuid(id)), FieldValue::Uuid(id));
}

#[test]
fn versions_keep_absent_components() {
    for version in [
        AssemblyVersion::new(1, 2),
        AssemblyVersion::from_components(&[1, 2, 3]).unwrap(),
        AssemblyVersion::full(1, 2, 3, 4),
    ] {
        let abi = AbiValue::version(version).unwrap();
        assert_eq!(read(&abi), FieldValue::Version(version));
    }
}

#[test]
fn oversized_version_component_is_rejected() {
    assert!(AbiValue::version(AssemblyVersion::new(u32::MAX, 0)).is_err());
}

#[test]
fn malformed_versions_are_rejected() {
    let mut abi = AbiValue::version(AssemblyVersion::full(1, 2, 3, 4)).unwrap();
    abi.version = [1, abi::VERSION_ABSENT, 3, abi::VERSION_ABSENT];
    assert!(unsafe { abi.read() }.is_err());

    abi.version = [1, -7, abi::VERSION_ABSENT, abi::VERSION_ABSENT];
    assert!(unsafe { abi.read() }.is_err());
}

#[test]
fn null_object_reads_as_null() {
    assert_eq!(read(&AbiValue::object(std::ptr::null_mut())), FieldValue::Null);
}

#[test]
fn unknown_kind_is_an_error() {
    let abi = AbiValue {
        kind: 42,
        ..AbiValue::NULL
    };
    assert!(unsafe { abi.read() }.is_err());
}

#[test]
fn empty_and_invalid_text() {
    assert_eq!(unsafe { AbiStr::EMPTY.copy_out() }.unwrap(), "");
    let bytes = [0xff_u8, 0xfe];
    let invalid = AbiStr {
        ptr: bytes.as_ptr(),
        len: bytes.len(),
    };
    assert!(unsafe { invalid.copy_out() }.is_err());
}
