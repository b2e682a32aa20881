//! `HostModule` and `SerializerModule` over loaded native libraries.

use std::path::Path;
use std::sync::Arc;

use hostlink_bridge::{DecodeEntry, EncodeEntry, Formatting, OptionsType, SerializerModule};
use hostlink_model::{
    FieldDescriptor, FieldValue, HostCallError, HostModule, HostObject, TypeDescriptor,
};
use libloading::{Library, Symbol};
use tracing::{debug, warn};

use crate::abi::{
    symbol_name, AbiStatus, AbiStr, AbiValue, ConstructFn, DecodeFn, DescribeNestedFn,
    DescribeTypeFn, EncodeFn, LastErrorFn, ObjectPtr, OptionsIsFn, OptionsNewFn,
    OptionsWithFormattingFn, ReadFieldFn, ReadValue, ReleaseFn, TypeOfFn, VTableFn, WriteFieldFn,
    HOST_ABI_VERSION, HOST_VTABLE_SYMBOL, STATUS_NOT_FOUND, STATUS_OK,
};
use crate::error::{HostError, HostResult};

/// A loaded library and the libraries it was loaded against.
///
/// Field order matters: the library is unloaded before its dependencies.
pub(crate) struct ModuleLibrary {
    library: Library,
    _dependencies: Vec<Library>,
}

pub(crate) fn open(path: &Path) -> HostResult<Library> {
    // SAFETY: loading runs the library's initialisers; hosts are trusted.
    unsafe { Library::new(path) }.map_err(|e| HostError::ModuleLoadFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Dependencies are loaded with global symbol visibility so the host
/// library can resolve against them.
#[cfg(unix)]
pub(crate) fn open_dependency(path: &Path) -> HostResult<Library> {
    use libloading::os::unix::{Library as UnixLibrary, RTLD_GLOBAL, RTLD_NOW};

    // SAFETY: as for `open`.
    unsafe { UnixLibrary::open(Some(path), RTLD_NOW | RTLD_GLOBAL) }
        .map(Library::from)
        .map_err(|e| HostError::ModuleLoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

#[cfg(not(unix))]
pub(crate) fn open_dependency(path: &Path) -> HostResult<Library> {
    open(path)
}

/// A reference to an object living in a native module.
pub struct NativeObject {
    ptr: ObjectPtr,
    release: Option<ReleaseFn>,
    _library: Arc<ModuleLibrary>,
}

// SAFETY: the protocol requires module objects to be usable from any
// thread; callers serialise access.
unsafe impl Send for NativeObject {}
unsafe impl Sync for NativeObject {}

impl NativeObject {
    fn owned(ptr: ObjectPtr, release: ReleaseFn, library: Arc<ModuleLibrary>) -> Self {
        Self {
            ptr,
            release: Some(release),
            _library: library,
        }
    }

    fn borrowed(ptr: ObjectPtr, library: Arc<ModuleLibrary>) -> Self {
        Self {
            ptr,
            release: None,
            _library: library,
        }
    }

    pub fn as_ptr(&self) -> ObjectPtr {
        self.ptr
    }
}

impl Drop for NativeObject {
    fn drop(&mut self) {
        if let Some(release) = self.release {
            // SAFETY: `ptr` is a reference this wrapper owns.
            unsafe { release(self.ptr) }
        }
    }
}

fn native(object: &HostObject) -> Result<&NativeObject, HostCallError> {
    object
        .downcast_ref::<NativeObject>()
        .ok_or_else(|| HostCallError::new("object was not produced by a native module"))
}

#[derive(Clone, Copy)]
struct HostFns {
    describe_type: DescribeTypeFn,
    describe_nested: Option<DescribeNestedFn>,
    construct: ConstructFn,
    type_of: TypeOfFn,
    read_field: ReadFieldFn,
    write_field: WriteFieldFn,
    last_error: Option<LastErrorFn>,
    release: ReleaseFn,
}

/// A host module answering through its exported vtable.
pub struct NativeHost {
    name: String,
    fns: HostFns,
    library: Arc<ModuleLibrary>,
}

impl NativeHost {
    /// Loads `dependencies` in order, then the host library itself.
    pub fn load(path: &Path, dependencies: &[impl AsRef<Path>]) -> HostResult<Self> {
        let dependencies = dependencies
            .iter()
            .map(|dep| open_dependency(dep.as_ref()))
            .collect::<HostResult<Vec<_>>>()?;
        let library = open(path)?;
        let library_name = path.display().to_string();

        // SAFETY: the symbol is declared by the protocol with this signature.
        let vtable = unsafe {
            let entry: Symbol<VTableFn> = library
                .get(HOST_VTABLE_SYMBOL.as_bytes())
                .map_err(|_| HostError::MissingSymbol {
                    library: library_name.clone(),
                    symbol: HOST_VTABLE_SYMBOL.to_string(),
                })?;
            let table = entry();
            if table.is_null() {
                return Err(HostError::ModuleLoadFailed {
                    path: path.to_path_buf(),
                    reason: "host returned a null vtable".to_string(),
                });
            }
            *table
        };

        if vtable.abi_version != HOST_ABI_VERSION {
            return Err(HostError::AbiMismatch {
                expected: HOST_ABI_VERSION,
                found: vtable.abi_version,
            });
        }

        let missing = |slot: &str| HostError::MissingSymbol {
            library: library_name.clone(),
            symbol: format!("{HOST_VTABLE_SYMBOL}.{slot}"),
        };
        let fns = HostFns {
            describe_type: vtable.describe_type.ok_or_else(|| missing("describe_type"))?,
            describe_nested: vtable.describe_nested,
            construct: vtable.construct.ok_or_else(|| missing("construct"))?,
            type_of: vtable.type_of.ok_or_else(|| missing("type_of"))?,
            read_field: vtable.read_field.ok_or_else(|| missing("read_field"))?,
            write_field: vtable.write_field.ok_or_else(|| missing("write_field"))?,
            last_error: vtable.last_error,
            release: vtable.release.ok_or_else(|| missing("release"))?,
        };

        // SAFETY: the vtable's name lives as long as the library.
        let name = match unsafe { vtable.module_name.copy_out() } {
            Ok(name) if !name.is_empty() => name,
            _ => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| library_name.clone()),
        };
        debug!(module = %name, path = %library_name, "loaded host module");

        Ok(Self {
            name,
            fns,
            library: Arc::new(ModuleLibrary {
                library,
                _dependencies: dependencies,
            }),
        })
    }

    fn last_error(&self, call: &str) -> HostCallError {
        let Some(last_error) = self.fns.last_error else {
            return HostCallError::new(format!("{call} failed in {}", self.name));
        };
        let mut out = AbiStr::EMPTY;
        // SAFETY: protocol call; `out` is a valid slot.
        let message = unsafe {
            last_error(&mut out);
            out.copy_out()
        };
        match message {
            Ok(message) if !message.is_empty() => HostCallError::new(message),
            _ => HostCallError::new(format!("{call} failed in {}", self.name)),
        }
    }

    fn check(&self, status: AbiStatus, call: &str) -> Result<(), HostCallError> {
        if status == STATUS_OK {
            Ok(())
        } else {
            Err(self.last_error(call))
        }
    }

    fn parse_descriptor(&self, status: AbiStatus, out: AbiStr, name: &str) -> Option<TypeDescriptor> {
        match status {
            STATUS_OK => {}
            STATUS_NOT_FOUND => return None,
            _ => {
                warn!(module = %self.name, type_name = %name, "{}", self.last_error("describe"));
                return None;
            }
        }
        // SAFETY: `out` was filled by the host for this call.
        let parsed = unsafe { out.copy_out() }
            .map_err(|e| e.to_string())
            .and_then(|json| serde_json::from_str(&json).map_err(|e| e.to_string()));
        match parsed {
            Ok(descriptor) => Some(descriptor),
            Err(e) => {
                warn!(module = %self.name, type_name = %name, error = %e, "invalid type descriptor");
                None
            }
        }
    }

    fn wrap(&self, ptr: ObjectPtr) -> HostObject {
        HostObject::new(NativeObject::owned(ptr, self.fns.release, self.library.clone()))
    }
}

impl HostModule for NativeHost {
    fn module_name(&self) -> &str {
        &self.name
    }

    fn find_type(&self, full_name: &str) -> Option<TypeDescriptor> {
        let mut out = AbiStr::EMPTY;
        // SAFETY: protocol call with borrowed input.
        let status = unsafe { (self.fns.describe_type)(AbiStr::borrowed(full_name), &mut out) };
        self.parse_descriptor(status, out, full_name)
    }

    fn find_nested_type(&self, parent: &TypeDescriptor, name: &str) -> Option<TypeDescriptor> {
        let describe_nested = self.fns.describe_nested?;
        let mut out = AbiStr::EMPTY;
        // SAFETY: protocol call with borrowed input.
        let status = unsafe {
            describe_nested(
                AbiStr::borrowed(&parent.full_name),
                AbiStr::borrowed(name),
                &mut out,
            )
        };
        self.parse_descriptor(status, out, name)
    }

    fn construct(&self, ty: &TypeDescriptor) -> Result<HostObject, HostCallError> {
        let mut out: ObjectPtr = std::ptr::null_mut();
        // SAFETY: protocol call with borrowed input.
        let status = unsafe { (self.fns.construct)(AbiStr::borrowed(&ty.full_name), &mut out) };
        self.check(status, "construct")?;
        if out.is_null() {
            return Err(HostCallError::new(format!(
                "host returned no instance of {}",
                ty.full_name
            )));
        }
        Ok(self.wrap(out))
    }

    fn type_of(&self, object: &HostObject) -> Option<String> {
        let object = native(object).ok()?;
        let mut out = AbiStr::EMPTY;
        // SAFETY: protocol call on an object this module produced.
        unsafe {
            if (self.fns.type_of)(object.as_ptr(), &mut out) != STATUS_OK {
                return None;
            }
            out.copy_out().ok()
        }
    }

    fn read_field(
        &self,
        object: &HostObject,
        field: &FieldDescriptor,
    ) -> Result<FieldValue, HostCallError> {
        let object = native(object)?;
        let mut out = AbiValue::NULL;
        // SAFETY: protocol call; `out` is valid until the next host call.
        let read = unsafe {
            let status = (self.fns.read_field)(object.as_ptr(), AbiStr::borrowed(&field.name), &mut out);
            self.check(status, "read_field")?;
            out.read()?
        };
        Ok(match read {
            ReadValue::Value(value) => value,
            ReadValue::Object(ptr) => FieldValue::Object(self.wrap(ptr)),
        })
    }

    fn write_field(
        &self,
        object: &HostObject,
        field: &FieldDescriptor,
        value: FieldValue,
    ) -> Result<(), HostCallError> {
        let object = native(object)?;
        let json;
        let abi = match &value {
            FieldValue::Null => AbiValue::NULL,
            FieldValue::Text(s) => AbiValue::text(s),
            FieldValue::Bool(b) => AbiValue::boolean(*b),
            FieldValue::Uuid(u) => AbiValue::uuid(*u),
            FieldValue::Version(v) => AbiValue::version(*v)?,
            FieldValue::Object(o) => AbiValue::object(native(o)?.as_ptr()),
            FieldValue::Raw(raw) => {
                json = raw.to_string();
                AbiValue::json(&json)
            }
        };
        // SAFETY: `abi` borrows from `value` and `json`, which outlive the call.
        let status = unsafe {
            (self.fns.write_field)(object.as_ptr(), AbiStr::borrowed(&field.name), &abi)
        };
        self.check(status, "write_field")
    }

    fn read_static(&self, symbol: &str) -> Option<HostObject> {
        // SAFETY: a data symbol holding an object pointer, per the protocol.
        let ptr = unsafe {
            let slot: Symbol<*const ObjectPtr> =
                self.library.library.get(symbol_name(symbol).as_bytes()).ok()?;
            let slot: *const ObjectPtr = *slot;
            if slot.is_null() {
                return None;
            }
            *slot
        };
        if ptr.is_null() {
            return None;
        }
        Some(HostObject::new(NativeObject::borrowed(ptr, self.library.clone())))
    }
}

/// A serializer library whose entry points are looked up by name.
pub struct NativeSerializer {
    name: String,
    library: Arc<ModuleLibrary>,
    host: Arc<NativeHost>,
}

impl NativeSerializer {
    /// Loads the serializer library. Objects it decodes belong to `host`.
    pub fn load(path: &Path, host: Arc<NativeHost>) -> HostResult<Self> {
        let library = open(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        debug!(module = %name, "loaded serializer module");
        Ok(Self {
            name,
            library: Arc::new(ModuleLibrary {
                library,
                _dependencies: Vec::new(),
            }),
            host,
        })
    }

    fn symbol<T: Copy>(&self, entry: &str) -> Option<T> {
        // SAFETY: callers request the signature the protocol assigns to `entry`.
        unsafe {
            self.library
                .library
                .get::<T>(symbol_name(entry).as_bytes())
                .ok()
                .map(|s| *s)
        }
    }
}

impl SerializerModule for NativeSerializer {
    fn module_name(&self) -> &str {
        &self.name
    }

    fn find_encoder(&self, name: &str) -> Option<Box<dyn EncodeEntry>> {
        let encode = self.symbol::<EncodeFn>(name)?;
        Some(Box::new(NativeEncoder {
            encode,
            _library: self.library.clone(),
        }))
    }

    fn find_decoder(&self, name: &str) -> Option<Box<dyn DecodeEntry>> {
        let decode = self.symbol::<DecodeFn>(name)?;
        Some(Box::new(NativeDecoder {
            decode,
            host: self.host.clone(),
            _library: self.library.clone(),
        }))
    }

    fn find_options_type(&self, name: &str) -> Option<Box<dyn OptionsType>> {
        Some(Box::new(NativeOptionsType {
            name: name.to_string(),
            new: self.symbol::<OptionsNewFn>(&format!("{name}_new"))?,
            with_formatting: self
                .symbol::<OptionsWithFormattingFn>(&format!("{name}_with_formatting"))?,
            is: self.symbol::<OptionsIsFn>(&format!("{name}_is"))?,
            release: self.symbol::<ReleaseFn>(&format!("{name}_release"))?,
            library: self.library.clone(),
        }))
    }
}

struct NativeEncoder {
    encode: EncodeFn,
    _library: Arc<ModuleLibrary>,
}

impl EncodeEntry for NativeEncoder {
    fn encode(
        &self,
        object: &HostObject,
        ty: &TypeDescriptor,
        options: &HostObject,
    ) -> Result<String, HostCallError> {
        let object = native(object)?;
        let options = native(options)?;
        let mut out = AbiStr::EMPTY;
        // SAFETY: protocol call; `out` carries the text or the error message.
        unsafe {
            let status = (self.encode)(
                object.as_ptr(),
                AbiStr::borrowed(&ty.full_name),
                options.as_ptr(),
                &mut out,
            );
            let text = out.copy_out()?;
            if status == STATUS_OK {
                Ok(text)
            } else {
                Err(HostCallError::new(text))
            }
        }
    }
}

struct NativeDecoder {
    decode: DecodeFn,
    host: Arc<NativeHost>,
    _library: Arc<ModuleLibrary>,
}

impl DecodeEntry for NativeDecoder {
    fn decode(
        &self,
        text: &str,
        ty: &TypeDescriptor,
        options: &HostObject,
    ) -> Result<HostObject, HostCallError> {
        let options = native(options)?;
        let mut object: ObjectPtr = std::ptr::null_mut();
        let mut error = AbiStr::EMPTY;
        // SAFETY: protocol call with borrowed inputs.
        let status = unsafe {
            (self.decode)(
                AbiStr::borrowed(text),
                AbiStr::borrowed(&ty.full_name),
                options.as_ptr(),
                &mut object,
                &mut error,
            )
        };
        if status != STATUS_OK || object.is_null() {
            // SAFETY: `error` was filled by the serializer for this call.
            let message = unsafe { error.copy_out() }?;
            return Err(HostCallError::new(if message.is_empty() {
                format!("decode of {} failed", ty.full_name)
            } else {
                message
            }));
        }
        Ok(self.host.wrap(object))
    }
}

struct NativeOptionsType {
    name: String,
    new: OptionsNewFn,
    with_formatting: OptionsWithFormattingFn,
    is: OptionsIsFn,
    release: ReleaseFn,
    library: Arc<ModuleLibrary>,
}

impl NativeOptionsType {
    fn wrap(&self, ptr: ObjectPtr, call: &str) -> Result<HostObject, HostCallError> {
        if ptr.is_null() {
            return Err(HostCallError::new(format!("{}_{call} returned null", self.name)));
        }
        Ok(HostObject::new(NativeObject::owned(ptr, self.release, self.library.clone())))
    }
}

impl OptionsType for NativeOptionsType {
    fn type_name(&self) -> &str {
        &self.name
    }

    fn accepts(&self, value: &HostObject) -> bool {
        match native(value) {
            // SAFETY: protocol call on a module object.
            Ok(object) => unsafe { (self.is)(object.as_ptr()) != 0 },
            Err(_) => false,
        }
    }

    fn create(&self) -> Result<HostObject, HostCallError> {
        // SAFETY: protocol call without inputs.
        let ptr = unsafe { (self.new)() };
        self.wrap(ptr, "new")
    }

    fn with_formatting(
        &self,
        options: &HostObject,
        formatting: Formatting,
    ) -> Result<HostObject, HostCallError> {
        let options = native(options)?;
        let indented = u8::from(formatting == Formatting::Indented);
        // SAFETY: protocol call on a module object.
        let ptr = unsafe { (self.with_formatting)(options.as_ptr(), indented) };
        self.wrap(ptr, "with_formatting")
    }
}
