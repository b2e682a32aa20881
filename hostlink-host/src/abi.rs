//! C layout of the native module protocol.
//!
//! Host library:
//! - exports `hostlink_host_vtable_v1() -> *const HostVTable`
//! - exports the default serializer options as a data symbol: a static
//!   holding an [`ObjectPtr`], borrowed for the life of the library
//!
//! Serializer library, for a configured entry name `N` (exported as
//! [`symbol_name`]`(N)`):
//! - encode: [`EncodeFn`]
//! - decode: [`DecodeFn`]
//! - options type: `N_new`, `N_with_formatting`, `N_is`, `N_release`
//!
//! Strings handed out by a library (`out` parameters of type [`AbiStr`])
//! stay valid until the next call into that library. Object pointers handed
//! out are new references, released with the owning library's release
//! function. Pointers passed in are borrowed for the duration of the call.

use std::ffi::c_void;

use hostlink_model::{FieldValue, HostCallError};
use hostlink_types::AssemblyVersion;
use uuid::Uuid;

pub const HOST_ABI_VERSION: u32 = 1;

pub const HOST_VTABLE_SYMBOL: &str = "hostlink_host_vtable_v1";

/// A host-side object reference.
pub type ObjectPtr = *mut c_void;

/// Borrowed UTF-8 text; never NUL-terminated.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct AbiStr {
    pub ptr: *const u8,
    pub len: usize,
}

impl AbiStr {
    pub const EMPTY: Self = Self {
        ptr: std::ptr::null(),
        len: 0,
    };

    /// Borrows `s`; the result must not outlive it.
    pub fn borrowed(s: &str) -> Self {
        Self {
            ptr: s.as_ptr(),
            len: s.len(),
        }
    }

    /// Copies the text out.
    ///
    /// # Safety
    /// `ptr` must be null or point at `len` readable bytes.
    pub unsafe fn copy_out(self) -> Result<String, HostCallError> {
        if self.ptr.is_null() || self.len == 0 {
            return Ok(String::new());
        }
        let bytes = unsafe { std::slice::from_raw_parts(self.ptr, self.len) };
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|e| HostCallError::new(format!("module returned invalid UTF-8: {e}")))
    }
}

pub const KIND_NULL: u8 = 0;
pub const KIND_TEXT: u8 = 1;
pub const KIND_BOOL: u8 = 2;
pub const KIND_UUID: u8 = 3;
pub const KIND_VERSION: u8 = 4;
pub const KIND_OBJECT: u8 = 5;
/// JSON text of a value of a kind the adapter does not marshal.
pub const KIND_JSON: u8 = 6;

/// Absent version component.
pub const VERSION_ABSENT: i32 = -1;

/// A tagged field value. Only the member selected by `kind` is meaningful.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct AbiValue {
    pub kind: u8,
    pub flag: u8,
    pub uuid: [u8; 16],
    pub version: [i32; 4],
    pub text: AbiStr,
    pub object: ObjectPtr,
}

/// A value read back from a module, before object pointers are wrapped.
#[derive(Debug)]
pub enum ReadValue {
    Value(FieldValue),
    Object(ObjectPtr),
}

impl AbiValue {
    pub const NULL: Self = Self {
        kind: KIND_NULL,
        flag: 0,
        uuid: [0; 16],
        version: [VERSION_ABSENT; 4],
        text: AbiStr::EMPTY,
        object: std::ptr::null_mut(),
    };

    /// Borrows `s`; the result must not outlive it.
    pub fn text(s: &str) -> Self {
        Self {
            kind: KIND_TEXT,
            text: AbiStr::borrowed(s),
            ..Self::NULL
        }
    }

    pub fn boolean(b: bool) -> Self {
        Self {
            kind: KIND_BOOL,
            flag: u8::from(b),
            ..Self::NULL
        }
    }

    pub fn uuid(u: Uuid) -> Self {
        Self {
            kind: KIND_UUID,
            uuid: *u.as_bytes(),
            ..Self::NULL
        }
    }

    pub fn version(v: AssemblyVersion) -> Result<Self, HostCallError> {
        let mut parts = [VERSION_ABSENT; 4];
        for (slot, component) in parts.iter_mut().zip(v.components()) {
            *slot = i32::try_from(component)
                .map_err(|_| HostCallError::new(format!("version component {component} out of range")))?;
        }
        Ok(Self {
            kind: KIND_VERSION,
            version: parts,
            ..Self::NULL
        })
    }

    /// Borrows `json`; the result must not outlive it.
    pub fn json(json: &str) -> Self {
        Self {
            kind: KIND_JSON,
            text: AbiStr::borrowed(json),
            ..Self::NULL
        }
    }

    pub fn object(ptr: ObjectPtr) -> Self {
        Self {
            kind: KIND_OBJECT,
            object: ptr,
            ..Self::NULL
        }
    }

    /// Converts a value the module wrote into `self`.
    ///
    /// # Safety
    /// For text values, `text` must satisfy [`AbiStr::copy_out`].
    pub unsafe fn read(&self) -> Result<ReadValue, HostCallError> {
        let value = match self.kind {
            KIND_NULL => FieldValue::Null,
            KIND_TEXT => FieldValue::Text(unsafe { self.text.copy_out() }?),
            KIND_BOOL => FieldValue::Bool(self.flag != 0),
            KIND_UUID => FieldValue::Uuid(Uuid::from_bytes(self.uuid)),
            KIND_VERSION => FieldValue::Version(decode_version(self.version)?),
            KIND_JSON => {
                let json = unsafe { self.text.copy_out() }?;
                let raw = serde_json::from_str(&json)
                    .map_err(|e| HostCallError::new(format!("module returned invalid JSON: {e}")))?;
                FieldValue::Raw(raw)
            }
            KIND_OBJECT if self.object.is_null() => FieldValue::Null,
            KIND_OBJECT => return Ok(ReadValue::Object(self.object)),
            other => {
                return Err(HostCallError::new(format!("unknown value kind {other}")));
            }
        };
        Ok(ReadValue::Value(value))
    }
}

fn decode_version(parts: [i32; 4]) -> Result<AssemblyVersion, HostCallError> {
    let present: Vec<u32> = parts
        .iter()
        .take_while(|p| **p != VERSION_ABSENT)
        .map(|p| u32::try_from(*p))
        .collect::<Result<_, _>>()
        .map_err(|_| HostCallError::new(format!("invalid version components {parts:?}")))?;
    if parts[present.len()..].iter().any(|p| *p != VERSION_ABSENT) {
        return Err(HostCallError::new(format!(
            "invalid version components {parts:?}"
        )));
    }
    AssemblyVersion::from_components(&present).map_err(|e| HostCallError::new(e.to_string()))
}

/// Status of a protocol call: zero on success.
pub type AbiStatus = i32;

pub const STATUS_OK: AbiStatus = 0;
/// Returned by the describe calls when the type does not exist.
pub const STATUS_NOT_FOUND: AbiStatus = 1;

pub type DescribeTypeFn = unsafe extern "C" fn(name: AbiStr, out_json: *mut AbiStr) -> AbiStatus;
pub type DescribeNestedFn =
    unsafe extern "C" fn(parent: AbiStr, name: AbiStr, out_json: *mut AbiStr) -> AbiStatus;
pub type ConstructFn = unsafe extern "C" fn(type_name: AbiStr, out: *mut ObjectPtr) -> AbiStatus;
pub type TypeOfFn = unsafe extern "C" fn(object: ObjectPtr, out_name: *mut AbiStr) -> AbiStatus;
pub type ReadFieldFn =
    unsafe extern "C" fn(object: ObjectPtr, field: AbiStr, out: *mut AbiValue) -> AbiStatus;
pub type WriteFieldFn =
    unsafe extern "C" fn(object: ObjectPtr, field: AbiStr, value: *const AbiValue) -> AbiStatus;
pub type LastErrorFn = unsafe extern "C" fn(out: *mut AbiStr);
pub type ReleaseFn = unsafe extern "C" fn(object: ObjectPtr);

/// Function table a host library publishes.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct HostVTable {
    pub abi_version: u32,
    pub module_name: AbiStr,
    pub describe_type: Option<DescribeTypeFn>,
    pub describe_nested: Option<DescribeNestedFn>,
    pub construct: Option<ConstructFn>,
    pub type_of: Option<TypeOfFn>,
    pub read_field: Option<ReadFieldFn>,
    pub write_field: Option<WriteFieldFn>,
    pub last_error: Option<LastErrorFn>,
    pub release: Option<ReleaseFn>,
}

pub type VTableFn = unsafe extern "C" fn() -> *const HostVTable;

pub type EncodeFn = unsafe extern "C" fn(
    object: ObjectPtr,
    type_name: AbiStr,
    options: ObjectPtr,
    out_text: *mut AbiStr,
) -> AbiStatus;
pub type DecodeFn = unsafe extern "C" fn(
    text: AbiStr,
    type_name: AbiStr,
    options: ObjectPtr,
    out_object: *mut ObjectPtr,
    out_error: *mut AbiStr,
) -> AbiStatus;
pub type OptionsNewFn = unsafe extern "C" fn() -> ObjectPtr;
pub type OptionsWithFormattingFn = unsafe extern "C" fn(options: ObjectPtr, indented: u8) -> ObjectPtr;
pub type OptionsIsFn = unsafe extern "C" fn(value: ObjectPtr) -> u8;

/// Exported symbol for a configured entry name: every character outside
/// `[A-Za-z0-9_]` becomes `_`.
pub fn symbol_name(entry: &str) -> String {
    entry
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}
