//! The serializer entry points and the default options slot.

#![allow(non_snake_case)]

use std::ffi::c_void;
use std::sync::Arc;

use hostlink_host::abi::{AbiStatus, AbiStr, ObjectPtr, STATUS_OK};
use hostlink_types::{AssemblyVersion, ValueKind};
use serde_json::{Map, Value as Json};
use uuid::Uuid;

use crate::catalog::{self, ASSEMBLY, Field, TypeDef};
use crate::node::{self, Instance, Node, Settings, Value};

const STATUS_FAILED: AbiStatus = 2;
const TYPE_TAG: &str = "$type";

static DEFAULT_SETTINGS: Node = Node::Settings(Settings {
    tagged: true,
    indented: true,
});

/// A data symbol holding an object pointer.
#[repr(transparent)]
pub struct ObjectSlot(ObjectPtr);

// SAFETY: the slot is never written and points at immutable static data.
unsafe impl Sync for ObjectSlot {}

#[unsafe(no_mangle)]
#[allow(non_upper_case_globals)]
pub static ConfigJsonSettings: ObjectSlot =
    ObjectSlot((&raw const DEFAULT_SETTINGS).cast_mut().cast::<c_void>());

/// # Safety
/// `options` must be a pointer this library handed out or the default slot.
unsafe fn settings(options: ObjectPtr) -> Result<Settings, String> {
    unsafe { node::borrow(options) }
        .and_then(Node::settings)
        .ok_or_else(|| "options are not serializer settings".to_string())
}

// ── Encode ───────────────────────────────────────────────────────

#[unsafe(no_mangle)]
pub unsafe extern "C" fn JsonConvert_SerializeObject(
    object: ObjectPtr,
    type_name: AbiStr,
    options: ObjectPtr,
    out_text: *mut AbiStr,
) -> AbiStatus {
    let encoded = (|| -> Result<String, String> {
        let settings = unsafe { settings(options) }?;
        let declared = unsafe { node::text(type_name) }?;
        let instance = unsafe { node::borrow(object) }
            .and_then(Node::instance)
            .ok_or_else(|| format!("cannot encode a non-instance as {declared}"))?;
        if instance.ty.full_name != declared {
            return Err(format!(
                "cannot encode {} as {declared}",
                instance.ty.full_name
            ));
        }
        let value = encode_instance(instance, settings)?;
        let text = if settings.indented {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        };
        text.map_err(|e| e.to_string())
    })();

    let (status, text) = match encoded {
        Ok(text) => (STATUS_OK, text),
        Err(message) => (STATUS_FAILED, message),
    };
    unsafe { out_text.write(node::hand_out(text)) };
    status
}

fn encode_instance(instance: &Instance, settings: Settings) -> Result<Json, String> {
    let mut map = Map::new();
    if settings.tagged {
        map.insert(
            TYPE_TAG.to_string(),
            Json::String(format!("{}, {ASSEMBLY}", instance.ty.full_name)),
        );
    }
    for field in instance.ty.fields {
        let value = match instance.get(field.name) {
            Value::Null => Json::Null,
            Value::Text(text) => Json::String(text),
            Value::Bool(b) => Json::Bool(b),
            Value::Uuid(u) => Json::String(u.hyphenated().to_string()),
            Value::Version(parts) => Json::String(version_text(parts)?),
            Value::Object(nested) => match nested.instance() {
                Some(nested) => encode_instance(nested, settings)?,
                None => return Err(format!("member {} holds a non-instance", field.name)),
            },
            Value::Json(json) => json,
        };
        map.insert(field.name.to_string(), value);
    }
    Ok(Json::Object(map))
}

fn version_text(parts: [i32; 4]) -> Result<String, String> {
    let components = parts
        .iter()
        .take_while(|p| **p >= 0)
        .map(|p| u32::try_from(*p).map_err(|e| e.to_string()))
        .collect::<Result<Vec<_>, _>>()?;
    AssemblyVersion::from_components(&components)
        .map(|v| v.to_string())
        .map_err(|e| e.to_string())
}

// ── Decode ───────────────────────────────────────────────────────

#[unsafe(no_mangle)]
pub unsafe extern "C" fn JsonConvert_DeserializeObject(
    text: AbiStr,
    type_name: AbiStr,
    options: ObjectPtr,
    out_object: *mut ObjectPtr,
    out_error: *mut AbiStr,
) -> AbiStatus {
    let decoded = (|| -> Result<Arc<Node>, String> {
        let settings = unsafe { settings(options) }?;
        let declared = unsafe { node::text(type_name) }?;
        let ty = catalog::find(&declared).ok_or_else(|| format!("unknown type {declared}"))?;
        let text = unsafe { node::text(text) }?;
        let json: Json = serde_json::from_str(&text).map_err(|e| e.to_string())?;
        decode_instance(&json, ty, settings)
    })();

    match decoded {
        Ok(node) => {
            unsafe { out_object.write(node::into_ptr(node)) };
            STATUS_OK
        }
        Err(message) => {
            unsafe { out_error.write(node::hand_out(message)) };
            STATUS_FAILED
        }
    }
}

fn decode_instance(json: &Json, declared: &'static TypeDef, settings: Settings) -> Result<Arc<Node>, String> {
    let Json::Object(map) = json else {
        return Err(format!("expected an object for {}", declared.full_name));
    };
    let ty = match map.get(TYPE_TAG).and_then(Json::as_str) {
        Some(tag) if settings.tagged => {
            let full_name = tag.split(',').next().unwrap_or_default().trim();
            catalog::find(full_name).ok_or_else(|| format!("could not resolve type {tag}"))?
        }
        _ => declared,
    };
    if !ty.constructible {
        return Err(format!("{} has no parameterless constructor", ty.full_name));
    }

    let node = node::construct(ty);
    let Some(instance) = node.instance() else {
        return Err(format!("could not construct {}", ty.full_name));
    };
    for (key, member) in map {
        if key == TYPE_TAG {
            continue;
        }
        let Some(field) = ty.field_ignore_case(key) else {
            continue;
        };
        let value = decode_member(field, member, settings)
            .map_err(|e| format!("member {}: {e}", field.name))?;
        instance.set(field.name, value);
    }
    Ok(node)
}

fn decode_member(field: &Field, member: &Json, settings: Settings) -> Result<Value, String> {
    Ok(match (field.kind, member) {
        (ValueKind::Unsupported, raw) => Value::Json(raw.clone()),
        (ValueKind::Text | ValueKind::Version | ValueKind::Object, Json::Null) => Value::Null,
        (ValueKind::Text, Json::String(s)) => Value::Text(s.clone()),
        (ValueKind::Bool, Json::Bool(b)) => Value::Bool(*b),
        (ValueKind::Uuid, Json::String(s)) => Value::Uuid(Uuid::parse_str(s).map_err(|e| e.to_string())?),
        (ValueKind::Version, Json::String(s)) => {
            let version = s.parse::<AssemblyVersion>().map_err(|e| e.to_string())?;
            let mut parts = [-1; 4];
            for (slot, component) in parts.iter_mut().zip(version.components()) {
                *slot = i32::try_from(component).map_err(|e| e.to_string())?;
            }
            Value::Version(parts)
        }
        (ValueKind::Object, nested) => {
            let type_name = field
                .type_name
                .and_then(catalog::find)
                .ok_or_else(|| "declared type is unknown".to_string())?;
            Value::Object(decode_instance(nested, type_name, settings)?)
        }
        (kind, other) => return Err(format!("cannot convert {other} to {}", kind.as_str())),
    })
}

// ── Options type ─────────────────────────────────────────────────

/// Untagged, compact.
#[unsafe(no_mangle)]
pub extern "C" fn JsonSerializerSettings_new() -> ObjectPtr {
    node::into_ptr(Arc::new(Node::Settings(Settings {
        tagged: false,
        indented: false,
    })))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn JsonSerializerSettings_with_formatting(options: ObjectPtr, indented: u8) -> ObjectPtr {
    match unsafe { settings(options) } {
        Ok(settings) => node::into_ptr(Arc::new(Node::Settings(Settings {
            indented: indented != 0,
            ..settings
        }))),
        Err(_) => std::ptr::null_mut(),
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn JsonSerializerSettings_is(value: ObjectPtr) -> u8 {
    u8::from(unsafe { settings(value) }.is_ok())
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn JsonSerializerSettings_release(options: ObjectPtr) {
    if options.cast_const() != ConfigJsonSettings.0.cast_const() {
        unsafe { node::release(options) };
    }
}
