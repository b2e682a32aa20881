//! A reflection-driven JSON serializer that runs in process.
//!
//! `MemorySerializer` walks host objects through the [`HostModule`] protocol,
//! so it works for any host, native or in-memory. It reproduces the parts of
//! the host serializer's behaviour the installer relies on:
//!
//! - `$type` tags in the simple assembly format (`"Full.Name, Assembly"`),
//!   written first in each object and controlled by [`TypeNameHandling`]
//! - indented or compact output
//! - case-insensitive member matching on decode, unknown members ignored
//! - versions as dotted strings and uuids in hyphenated form
//!
//! Fields of unsupported kinds (lists, enums, numbers) travel as raw JSON:
//! decode stores the member as [`FieldValue::Raw`] and encode writes it back
//! unchanged.

use std::sync::Arc;

use hostlink_model::{FieldDescriptor, FieldValue, HostCallError, HostModule, HostObject, TypeDescriptor};
use hostlink_types::{AssemblyVersion, ValueKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::module::{DecodeEntry, EncodeEntry, EntryPoints, Formatting, OptionsType, SerializerModule};

const TYPE_TAG: &str = "$type";

/// When `$type` tags are written and honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeNameHandling {
    #[default]
    None,
    Objects,
    All,
    /// Only when the runtime type differs from the declared one.
    Auto,
}

/// Options value of the in-process serializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JsonSettings {
    pub type_name_handling: TypeNameHandling,
    pub formatting: Formatting,
}

impl JsonSettings {
    /// No tags, compact output.
    pub fn plain() -> Self {
        Self::default()
    }

    /// Tags on every object, indented output. This is what hosts use for
    /// their own configuration files.
    pub fn tagged() -> Self {
        Self {
            type_name_handling: TypeNameHandling::All,
            formatting: Formatting::Indented,
        }
    }

    fn tags_on_write(&self, runtime: &str, declared: &str) -> bool {
        match self.type_name_handling {
            TypeNameHandling::None => false,
            TypeNameHandling::Objects | TypeNameHandling::All => true,
            TypeNameHandling::Auto => runtime != declared,
        }
    }
}

fn settings_of(options: &HostObject) -> Result<JsonSettings, HostCallError> {
    options
        .downcast_ref::<JsonSettings>()
        .copied()
        .ok_or_else(|| HostCallError::new("options are not JSON serializer settings"))
}

/// In-process serializer over any host module.
pub struct MemorySerializer {
    host: Arc<dyn HostModule>,
    entry_points: EntryPoints,
}

impl MemorySerializer {
    /// Answers to the default entry point names.
    pub fn new(host: Arc<dyn HostModule>) -> Self {
        Self::with_entry_points(host, EntryPoints::default())
    }

    pub fn with_entry_points(host: Arc<dyn HostModule>, entry_points: EntryPoints) -> Self {
        Self { host, entry_points }
    }
}

impl SerializerModule for MemorySerializer {
    fn module_name(&self) -> &str {
        "hostlink.json"
    }

    fn find_encoder(&self, name: &str) -> Option<Box<dyn EncodeEntry>> {
        (name == self.entry_points.encode).then(|| {
            Box::new(Encoder {
                host: self.host.clone(),
            }) as Box<dyn EncodeEntry>
        })
    }

    fn find_decoder(&self, name: &str) -> Option<Box<dyn DecodeEntry>> {
        (name == self.entry_points.decode).then(|| {
            Box::new(Decoder {
                host: self.host.clone(),
            }) as Box<dyn DecodeEntry>
        })
    }

    fn find_options_type(&self, name: &str) -> Option<Box<dyn OptionsType>> {
        (name == self.entry_points.options_type).then(|| {
            Box::new(SettingsType {
                name: name.to_string(),
            }) as Box<dyn OptionsType>
        })
    }
}

struct SettingsType {
    name: String,
}

impl OptionsType for SettingsType {
    fn type_name(&self) -> &str {
        &self.name
    }

    fn accepts(&self, value: &HostObject) -> bool {
        value.downcast_ref::<JsonSettings>().is_some()
    }

    fn create(&self) -> Result<HostObject, HostCallError> {
        Ok(HostObject::new(JsonSettings::plain()))
    }

    fn with_formatting(
        &self,
        options: &HostObject,
        formatting: Formatting,
    ) -> Result<HostObject, HostCallError> {
        let mut settings = settings_of(options)?;
        settings.formatting = formatting;
        Ok(HostObject::new(settings))
    }
}

// ── Encode ───────────────────────────────────────────────────────

struct Encoder {
    host: Arc<dyn HostModule>,
}

impl EncodeEntry for Encoder {
    fn encode(
        &self,
        object: &HostObject,
        ty: &TypeDescriptor,
        options: &HostObject,
    ) -> Result<String, HostCallError> {
        let settings = settings_of(options)?;
        let value = self.object_to_value(object, ty, &settings)?;
        let text = match settings.formatting {
            Formatting::None => serde_json::to_string(&value),
            Formatting::Indented => serde_json::to_string_pretty(&value),
        };
        text.map_err(|e| HostCallError::new(e.to_string()))
    }
}

impl Encoder {
    fn runtime_type(&self, object: &HostObject, declared: &TypeDescriptor) -> TypeDescriptor {
        self.host
            .type_of(object)
            .filter(|name| *name != declared.full_name)
            .and_then(|name| self.host.find_type(&name))
            .unwrap_or_else(|| declared.clone())
    }

    fn object_to_value(
        &self,
        object: &HostObject,
        declared: &TypeDescriptor,
        settings: &JsonSettings,
    ) -> Result<Value, HostCallError> {
        let runtime = self.runtime_type(object, declared);
        let mut map = Map::new();
        if settings.tags_on_write(&runtime.full_name, &declared.full_name) {
            map.insert(TYPE_TAG.to_string(), Value::String(runtime.qualified_name()));
        }

        for field in runtime.fields.iter().filter(|f| is_serialized(f) && f.can_read) {
            let value = self.host.read_field(object, field)?;
            map.insert(field.name.clone(), self.field_to_value(field, value, settings)?);
        }
        Ok(Value::Object(map))
    }

    fn field_to_value(
        &self,
        field: &FieldDescriptor,
        value: FieldValue,
        settings: &JsonSettings,
    ) -> Result<Value, HostCallError> {
        Ok(match value {
            FieldValue::Null => Value::Null,
            FieldValue::Text(s) => Value::String(s),
            FieldValue::Bool(b) => Value::Bool(b),
            FieldValue::Uuid(u) => Value::String(u.hyphenated().to_string()),
            FieldValue::Version(v) => Value::String(v.to_string()),
            FieldValue::Object(nested) => {
                let declared = declared_type(self.host.as_ref(), field)?;
                self.object_to_value(&nested, &declared, settings)?
            }
            FieldValue::Raw(raw) => raw,
        })
    }
}

fn is_serialized(field: &FieldDescriptor) -> bool {
    field.is_instance && field.is_public
}

fn declared_type(host: &dyn HostModule, field: &FieldDescriptor) -> Result<TypeDescriptor, HostCallError> {
    let name = field
        .type_name
        .as_deref()
        .ok_or_else(|| HostCallError::new(format!("field {} has no declared type", field.name)))?;
    host.find_type(name)
        .ok_or_else(|| HostCallError::new(format!("could not resolve type {name}")))
}

// ── Decode ───────────────────────────────────────────────────────

struct Decoder {
    host: Arc<dyn HostModule>,
}

impl DecodeEntry for Decoder {
    fn decode(
        &self,
        text: &str,
        ty: &TypeDescriptor,
        options: &HostObject,
    ) -> Result<HostObject, HostCallError> {
        let settings = settings_of(options)?;
        let value: Value =
            serde_json::from_str(text).map_err(|e| HostCallError::new(e.to_string()))?;
        self.value_to_object(&value, ty, &settings)
    }
}

impl Decoder {
    fn value_to_object(
        &self,
        value: &Value,
        declared: &TypeDescriptor,
        settings: &JsonSettings,
    ) -> Result<HostObject, HostCallError> {
        let Value::Object(map) = value else {
            return Err(HostCallError::new(format!(
                "expected an object for {}, found {}",
                declared.full_name,
                json_kind(value)
            )));
        };

        let target = match map.get(TYPE_TAG) {
            Some(tag) if settings.type_name_handling != TypeNameHandling::None => {
                self.resolve_tag(tag)?
            }
            _ => declared.clone(),
        };

        let object = self.host.construct(&target)?;
        for (key, member) in map {
            if key == TYPE_TAG {
                continue;
            }
            let Some(field) = target
                .fields
                .iter()
                .find(|f| is_serialized(f) && f.can_write && f.name.eq_ignore_ascii_case(key))
            else {
                continue;
            };
            let value = self.value_to_field(field, member, settings)?;
            self.host.write_field(&object, field, value)?;
        }
        Ok(object)
    }

    fn resolve_tag(&self, tag: &Value) -> Result<TypeDescriptor, HostCallError> {
        let qualified = tag
            .as_str()
            .ok_or_else(|| HostCallError::new("$type must be a string"))?;
        let full_name = qualified.split(',').next().unwrap_or_default().trim();
        self.host
            .find_type(full_name)
            .ok_or_else(|| HostCallError::new(format!("could not resolve type {qualified}")))
    }

    fn value_to_field(
        &self,
        field: &FieldDescriptor,
        value: &Value,
        settings: &JsonSettings,
    ) -> Result<FieldValue, HostCallError> {
        let unexpected = || {
            HostCallError::new(format!(
                "cannot convert {} to {} for member {}",
                json_kind(value),
                field.kind,
                field.name
            ))
        };

        match (field.kind, value) {
            (ValueKind::Unsupported, raw) => Ok(FieldValue::Raw(raw.clone())),
            (kind, Value::Null) if kind.is_nullable() => Ok(FieldValue::Null),
            (ValueKind::Text, Value::String(s)) => Ok(FieldValue::Text(s.clone())),
            (ValueKind::Bool, Value::Bool(b)) => Ok(FieldValue::Bool(*b)),
            (ValueKind::Uuid, Value::String(s)) => Uuid::parse_str(s)
                .map(FieldValue::Uuid)
                .map_err(|e| HostCallError::new(format!("member {}: {e}", field.name))),
            (ValueKind::Version, Value::String(s)) => s
                .parse::<AssemblyVersion>()
                .map(FieldValue::Version)
                .map_err(|e| HostCallError::new(format!("member {}: {e}", field.name))),
            (ValueKind::Object, Value::Object(_)) => {
                let declared = declared_type(self.host.as_ref(), field)?;
                self.value_to_object(value, &declared, settings)
                    .map(FieldValue::Object)
            }
            _ => Err(unexpected()),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
