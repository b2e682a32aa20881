//! The host vtable.

use hostlink_host::abi::{
    AbiStatus, AbiStr, AbiValue, ConstructFn, DescribeNestedFn, DescribeTypeFn, HOST_ABI_VERSION,
    HostVTable, KIND_BOOL, KIND_JSON, KIND_NULL, KIND_OBJECT, KIND_TEXT, KIND_UUID, KIND_VERSION,
    LastErrorFn, ObjectPtr, ReadFieldFn, ReleaseFn, STATUS_NOT_FOUND, STATUS_OK, TypeOfFn,
    WriteFieldFn,
};
use uuid::Uuid;

use crate::catalog::{self, ASSEMBLY};
use crate::node::{self, Node, Value};

const STATUS_FAILED: AbiStatus = 2;

struct Table(HostVTable);

// SAFETY: the table only points at static data and functions.
unsafe impl Sync for Table {}

static VTABLE: Table = Table(HostVTable {
    abi_version: HOST_ABI_VERSION,
    module_name: AbiStr {
        ptr: ASSEMBLY.as_ptr(),
        len: ASSEMBLY.len(),
    },
    describe_type: Some(describe_type as DescribeTypeFn),
    describe_nested: Some(describe_nested as DescribeNestedFn),
    construct: Some(construct as ConstructFn),
    type_of: Some(type_of as TypeOfFn),
    read_field: Some(read_field as ReadFieldFn),
    write_field: Some(write_field as WriteFieldFn),
    last_error: Some(last_error as LastErrorFn),
    release: Some(release as ReleaseFn),
});

#[unsafe(no_mangle)]
pub extern "C" fn hostlink_host_vtable_v1() -> *const HostVTable {
    &VTABLE.0
}

/// Records `message` for `last_error` and reports failure.
fn fail(message: String) -> AbiStatus {
    node::set_last_error(message);
    STATUS_FAILED
}

fn describe(ty: Option<&catalog::TypeDef>, out_json: *mut AbiStr) -> AbiStatus {
    let Some(ty) = ty else {
        return STATUS_NOT_FOUND;
    };
    // SAFETY: callers pass a valid out slot.
    unsafe { out_json.write(node::hand_out(ty.descriptor().to_string())) };
    STATUS_OK
}

unsafe extern "C" fn describe_type(name: AbiStr, out_json: *mut AbiStr) -> AbiStatus {
    match unsafe { node::text(name) } {
        Ok(name) => describe(catalog::find(&name), out_json),
        Err(e) => fail(e),
    }
}

unsafe extern "C" fn describe_nested(parent: AbiStr, name: AbiStr, out_json: *mut AbiStr) -> AbiStatus {
    let (parent, name) = match unsafe { (node::text(parent), node::text(name)) } {
        (Ok(parent), Ok(name)) => (parent, name),
        (Err(e), _) | (_, Err(e)) => return fail(e),
    };
    let nested = catalog::find(&parent)
        .filter(|p| p.nested.contains(&name.as_str()))
        .and_then(|_| catalog::find(&format!("{parent}+{name}")));
    describe(nested, out_json)
}

unsafe extern "C" fn construct(type_name: AbiStr, out: *mut ObjectPtr) -> AbiStatus {
    let name = match unsafe { node::text(type_name) } {
        Ok(name) => name,
        Err(e) => return fail(e),
    };
    let Some(ty) = catalog::find(&name) else {
        return fail(format!("unknown type {name}"));
    };
    if !ty.constructible {
        return fail(format!("{name} has no parameterless constructor"));
    }
    unsafe { out.write(node::into_ptr(node::construct(ty))) };
    STATUS_OK
}

unsafe extern "C" fn type_of(object: ObjectPtr, out_name: *mut AbiStr) -> AbiStatus {
    match unsafe { node::borrow(object) }.and_then(Node::instance) {
        Some(instance) => {
            unsafe { out_name.write(node::hand_out(instance.ty.full_name.to_string())) };
            STATUS_OK
        }
        None => fail("not an instance".to_string()),
    }
}

unsafe extern "C" fn read_field(object: ObjectPtr, field: AbiStr, out: *mut AbiValue) -> AbiStatus {
    let Some(instance) = (unsafe { node::borrow(object) }).and_then(Node::instance) else {
        return fail("not an instance".to_string());
    };
    let name = match unsafe { node::text(field) } {
        Ok(name) => name,
        Err(e) => return fail(e),
    };
    let Some(field) = instance.ty.field(&name) else {
        return fail(format!("{} has no field {name}", instance.ty.full_name));
    };

    let value = match instance.get(field.name) {
        Value::Null => AbiValue::NULL,
        Value::Text(text) => AbiValue {
            kind: KIND_TEXT,
            text: node::hand_out(text),
            ..AbiValue::NULL
        },
        Value::Bool(b) => AbiValue::boolean(b),
        Value::Uuid(u) => AbiValue::uuid(u),
        Value::Version(parts) => AbiValue {
            kind: KIND_VERSION,
            version: parts,
            ..AbiValue::NULL
        },
        Value::Object(nested) => AbiValue::object(node::into_ptr(nested)),
        Value::Json(json) => AbiValue {
            kind: KIND_JSON,
            text: node::hand_out(json.to_string()),
            ..AbiValue::NULL
        },
    };
    unsafe { out.write(value) };
    STATUS_OK
}

unsafe extern "C" fn write_field(object: ObjectPtr, field: AbiStr, value: *const AbiValue) -> AbiStatus {
    let Some(instance) = (unsafe { node::borrow(object) }).and_then(Node::instance) else {
        return fail("not an instance".to_string());
    };
    let name = match unsafe { node::text(field) } {
        Ok(name) => name,
        Err(e) => return fail(e),
    };
    let Some(field) = instance.ty.field(&name) else {
        return fail(format!("{} has no field {name}", instance.ty.full_name));
    };
    let Some(value) = (unsafe { value.as_ref() }) else {
        return fail("value is null".to_string());
    };

    let converted = match unsafe { from_abi(value) } {
        Ok(converted) => converted,
        Err(e) => return fail(e),
    };
    if !converted.fits(field.kind) {
        return fail(format!(
            "{}.{} expects {}",
            instance.ty.full_name,
            field.name,
            field.kind.as_str()
        ));
    }
    instance.set(field.name, converted);
    STATUS_OK
}

/// # Safety
/// Text and object members must be valid per the protocol.
unsafe fn from_abi(value: &AbiValue) -> Result<Value, String> {
    Ok(match value.kind {
        KIND_NULL => Value::Null,
        KIND_TEXT => Value::Text(unsafe { node::text(value.text) }?),
        KIND_BOOL => Value::Bool(value.flag != 0),
        KIND_UUID => Value::Uuid(Uuid::from_bytes(value.uuid)),
        KIND_VERSION => Value::Version(value.version),
        KIND_OBJECT if value.object.is_null() => Value::Null,
        KIND_OBJECT => match unsafe { node::borrow(value.object) } {
            Some(Node::Instance(_)) => Value::Object(unsafe { node::share(value.object) }),
            _ => return Err("object value is not an instance".to_string()),
        },
        KIND_JSON => {
            let json = unsafe { node::text(value.text) }?;
            Value::Json(serde_json::from_str(&json).map_err(|e| e.to_string())?)
        }
        other => return Err(format!("unknown value kind {other}")),
    })
}

unsafe extern "C" fn last_error(out: *mut AbiStr) {
    unsafe { out.write(node::last_error()) };
}

unsafe extern "C" fn release(object: ObjectPtr) {
    unsafe { node::release(object) };
}
