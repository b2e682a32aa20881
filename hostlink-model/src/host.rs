//! The reflection protocol a host module answers.
//!
//! A host describes its types as [`TypeDescriptor`]s and hands out live
//! values as [`HostObject`]s. The adapter never looks inside a `HostObject`;
//! only the module that produced it does.

use hostlink_types::{AssemblyVersion, ValueKind};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::HostCallError;

fn yes() -> bool {
    true
}

/// One field (property) of a host type, as the host reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: ValueKind,
    /// Full name of the field's declared type when `kind` is `Object`, or the
    /// host's own type name for `Unsupported` fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default = "yes")]
    pub is_instance: bool,
    #[serde(default = "yes")]
    pub is_public: bool,
    #[serde(default = "yes")]
    pub can_read: bool,
    #[serde(default = "yes")]
    pub can_write: bool,
}

impl FieldDescriptor {
    /// A public, readable, writable instance field.
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            type_name: None,
            is_instance: true,
            is_public: true,
            can_read: true,
            can_write: true,
        }
    }

    /// Whether an outside caller may set this field on an instance. This is
    /// the set schema drift is measured against.
    #[must_use]
    pub fn is_externally_writable(&self) -> bool {
        self.is_instance && self.is_public && self.can_write
    }
}

/// A host type, as the host reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// Fully-qualified name. Nested types use `Outer+Inner`.
    pub full_name: String,
    /// Name of the host assembly/library that defines the type.
    pub assembly: String,
    /// Whether the type has a parameterless constructor.
    #[serde(default = "yes")]
    pub constructible: bool,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    /// Simple names of types declared inside this one.
    #[serde(default)]
    pub nested: Vec<String>,
}

impl TypeDescriptor {
    /// Looks up an instance field by exact name.
    #[must_use]
    pub fn instance_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.is_instance && f.name == name)
    }

    /// `Full.Name, Assembly`, the form hosts use in type tags.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}, {}", self.full_name, self.assembly)
    }
}

/// A live value owned by a host module.
///
/// Cloning shares the same underlying host value; it never copies it.
#[derive(Clone)]
pub struct HostObject {
    inner: Arc<dyn Any + Send + Sync>,
}

impl HostObject {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }

    /// Returns the module-specific representation, if it is a `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Whether both handles point at the same host value.
    #[must_use]
    pub fn same_object(&self, other: &HostObject) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostObject({:p})", Arc::as_ptr(&self.inner))
    }
}

/// A value crossing the adapter.
#[derive(Debug, Clone)]
pub enum FieldValue {
    Null,
    Text(String),
    Bool(bool),
    Uuid(Uuid),
    Version(AssemblyVersion),
    Object(HostObject),
    /// The serialized form of a value of an unsupported kind. Only
    /// serializers produce and consume these; the builder refuses them.
    Raw(serde_json::Value),
}

impl FieldValue {
    /// The kind of a non-null value.
    #[must_use]
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Self::Null => None,
            Self::Text(_) => Some(ValueKind::Text),
            Self::Bool(_) => Some(ValueKind::Bool),
            Self::Uuid(_) => Some(ValueKind::Uuid),
            Self::Version(_) => Some(ValueKind::Version),
            Self::Object(_) => Some(ValueKind::Object),
            Self::Raw(_) => Some(ValueKind::Unsupported),
        }
    }

    /// The value a freshly constructed host instance holds for `kind`.
    #[must_use]
    pub fn default_for(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Bool => Self::Bool(false),
            ValueKind::Uuid => Self::Uuid(Uuid::nil()),
            ValueKind::Text | ValueKind::Version | ValueKind::Object | ValueKind::Unsupported => {
                Self::Null
            }
        }
    }

    /// Name used in mismatch diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        self.kind().map_or("null", ValueKind::as_str)
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Self::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_version(&self) -> Option<AssemblyVersion> {
        match self {
            Self::Version(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&HostObject> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_raw(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Raw(v) => Some(v),
            _ => None,
        }
    }
}

/// Objects compare by identity; everything else by value.
impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Uuid(a), Self::Uuid(b)) => a == b,
            (Self::Version(a), Self::Version(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a.same_object(b),
            (Self::Raw(a), Self::Raw(b)) => a == b,
            _ => false,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl From<AssemblyVersion> for FieldValue {
    fn from(value: AssemblyVersion) -> Self {
        Self::Version(value)
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Null, Self::Text)
    }
}

/// Reflection access to a loaded host module.
///
/// Implementations answer by name; they never need compile-time knowledge
/// of the caller. Lookups return `None` for absent types so the registry can
/// report precisely what is missing.
pub trait HostModule: Send + Sync {
    /// Name of the module, used in diagnostics and as the assembly name.
    fn module_name(&self) -> &str;

    /// Describes a type by fully-qualified name.
    fn find_type(&self, full_name: &str) -> Option<TypeDescriptor>;

    /// Describes a type declared inside `parent`, by simple name.
    fn find_nested_type(&self, parent: &TypeDescriptor, name: &str) -> Option<TypeDescriptor>;

    /// Creates an instance with the type's parameterless constructor.
    fn construct(&self, ty: &TypeDescriptor) -> Result<HostObject, HostCallError>;

    /// Full name of the runtime type of `object`, if this module owns it.
    fn type_of(&self, object: &HostObject) -> Option<String>;

    fn read_field(
        &self,
        object: &HostObject,
        field: &FieldDescriptor,
    ) -> Result<FieldValue, HostCallError>;

    fn write_field(
        &self,
        object: &HostObject,
        field: &FieldDescriptor,
        value: FieldValue,
    ) -> Result<(), HostCallError>;

    /// Reads a static value the host exposes under `symbol`.
    fn read_static(&self, symbol: &str) -> Option<HostObject>;
}
