//! An in-process host module.
//!
//! `MemoryHost` answers the same reflection protocol a native host does, over
//! types declared in Rust. It backs the reference host shape the installer
//! ships and every test that needs a host without loading a library.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};

use hostlink_types::ValueKind;

use crate::error::HostCallError;
use crate::host::{FieldDescriptor, FieldValue, HostModule, HostObject, TypeDescriptor};

/// Declaration of one type for a [`MemoryHost`].
#[derive(Debug, Clone)]
pub struct TypeDef {
    name: String,
    constructible: bool,
    fields: Vec<FieldDescriptor>,
    nested: Vec<TypeDef>,
}

impl TypeDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constructible: true,
            fields: Vec::new(),
            nested: Vec::new(),
        }
    }

    pub fn field(mut self, descriptor: FieldDescriptor) -> Self {
        self.fields.push(descriptor);
        self
    }

    pub fn text(self, name: &str) -> Self {
        self.field(FieldDescriptor::new(name, ValueKind::Text))
    }

    pub fn bool(self, name: &str) -> Self {
        self.field(FieldDescriptor::new(name, ValueKind::Bool))
    }

    pub fn uuid(self, name: &str) -> Self {
        self.field(FieldDescriptor::new(name, ValueKind::Uuid))
    }

    pub fn version(self, name: &str) -> Self {
        self.field(FieldDescriptor::new(name, ValueKind::Version))
    }

    /// An object-valued field holding instances of `type_name`.
    pub fn object(self, name: &str, type_name: &str) -> Self {
        let mut field = FieldDescriptor::new(name, ValueKind::Object);
        field.type_name = Some(type_name.to_string());
        self.field(field)
    }

    /// A field of a host type the adapter cannot marshal (lists, enums...).
    pub fn unsupported(self, name: &str, host_type: &str) -> Self {
        let mut field = FieldDescriptor::new(name, ValueKind::Unsupported);
        field.type_name = Some(host_type.to_string());
        self.field(field)
    }

    pub fn read_only(self, name: &str, kind: ValueKind) -> Self {
        let mut field = FieldDescriptor::new(name, kind);
        field.can_write = false;
        self.field(field)
    }

    pub fn private(self, name: &str, kind: ValueKind) -> Self {
        let mut field = FieldDescriptor::new(name, kind);
        field.is_public = false;
        self.field(field)
    }

    pub fn static_field(self, name: &str, kind: ValueKind) -> Self {
        let mut field = FieldDescriptor::new(name, kind);
        field.is_instance = false;
        self.field(field)
    }

    pub fn no_default_ctor(mut self) -> Self {
        self.constructible = false;
        self
    }

    /// Declares `child` inside this type; its full name becomes `Outer+Child`.
    pub fn nested(mut self, child: TypeDef) -> Self {
        self.nested.push(child);
        self
    }
}

/// Builder for [`MemoryHost`].
#[derive(Debug)]
pub struct MemoryHostBuilder {
    name: String,
    types: Vec<TypeDef>,
    statics: HashMap<String, HostObject>,
}

impl MemoryHostBuilder {
    pub fn with_type(mut self, def: TypeDef) -> Self {
        self.types.push(def);
        self
    }

    /// Exposes `value` under `symbol`, like a host's static field.
    pub fn static_value(mut self, symbol: impl Into<String>, value: HostObject) -> Self {
        self.statics.insert(symbol.into(), value);
        self
    }

    pub fn build(self) -> MemoryHost {
        let mut types = BTreeMap::new();
        for def in self.types {
            register(&self.name, None, def, &mut types);
        }
        MemoryHost {
            name: self.name,
            types,
            statics: self.statics,
        }
    }
}

fn register(
    assembly: &str,
    outer: Option<&str>,
    def: TypeDef,
    types: &mut BTreeMap<String, TypeDescriptor>,
) {
    let full_name = match outer {
        Some(outer) => format!("{outer}+{}", def.name),
        None => def.name,
    };
    let descriptor = TypeDescriptor {
        full_name: full_name.clone(),
        assembly: assembly.to_string(),
        constructible: def.constructible,
        fields: def.fields,
        nested: def.nested.iter().map(|n| n.name.clone()).collect(),
    };
    types.insert(full_name.clone(), descriptor);
    for child in def.nested {
        register(assembly, Some(&full_name), child, types);
    }
}

/// A host instance created by a [`MemoryHost`].
#[derive(Debug)]
pub struct MemoryObject {
    type_name: String,
    values: Mutex<BTreeMap<String, FieldValue>>,
}

impl MemoryObject {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Current value of an instance field.
    pub fn value(&self, field: &str) -> Option<FieldValue> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(field)
            .cloned()
    }
}

/// A host module whose types live in process memory.
#[derive(Debug)]
pub struct MemoryHost {
    name: String,
    types: BTreeMap<String, TypeDescriptor>,
    statics: HashMap<String, HostObject>,
}

impl MemoryHost {
    pub fn builder(name: impl Into<String>) -> MemoryHostBuilder {
        MemoryHostBuilder {
            name: name.into(),
            types: Vec::new(),
            statics: HashMap::new(),
        }
    }

    fn owned<'a>(&self, object: &'a HostObject) -> Result<&'a MemoryObject, HostCallError> {
        object
            .downcast_ref::<MemoryObject>()
            .ok_or_else(|| HostCallError::new(format!("object does not belong to {}", self.name)))
    }

    fn check_field(&self, object: &MemoryObject, field: &FieldDescriptor) -> Result<(), HostCallError> {
        let declared = self
            .types
            .get(&object.type_name)
            .and_then(|ty| ty.instance_field(&field.name));
        match declared {
            Some(_) => Ok(()),
            None => Err(HostCallError::new(format!(
                "{} has no instance field {}",
                object.type_name, field.name
            ))),
        }
    }
}

impl HostModule for MemoryHost {
    fn module_name(&self) -> &str {
        &self.name
    }

    fn find_type(&self, full_name: &str) -> Option<TypeDescriptor> {
        self.types.get(full_name).cloned()
    }

    fn find_nested_type(&self, parent: &TypeDescriptor, name: &str) -> Option<TypeDescriptor> {
        if !parent.nested.iter().any(|n| n == name) {
            return None;
        }
        self.types
            .get(&format!("{}+{name}", parent.full_name))
            .cloned()
    }

    fn construct(&self, ty: &TypeDescriptor) -> Result<HostObject, HostCallError> {
        let known = self
            .types
            .get(&ty.full_name)
            .ok_or_else(|| HostCallError::new(format!("unknown type {}", ty.full_name)))?;
        if !known.constructible {
            return Err(HostCallError::new(format!(
                "{} has no parameterless constructor",
                ty.full_name
            )));
        }
        let values = known
            .fields
            .iter()
            .filter(|f| f.is_instance)
            .map(|f| (f.name.clone(), FieldValue::default_for(f.kind)))
            .collect();
        Ok(HostObject::new(MemoryObject {
            type_name: known.full_name.clone(),
            values: Mutex::new(values),
        }))
    }

    fn type_of(&self, object: &HostObject) -> Option<String> {
        object
            .downcast_ref::<MemoryObject>()
            .map(|o| o.type_name.clone())
    }

    fn read_field(
        &self,
        object: &HostObject,
        field: &FieldDescriptor,
    ) -> Result<FieldValue, HostCallError> {
        let object = self.owned(object)?;
        self.check_field(object, field)?;
        Ok(object.value(&field.name).unwrap_or(FieldValue::Null))
    }

    fn write_field(
        &self,
        object: &HostObject,
        field: &FieldDescriptor,
        value: FieldValue,
    ) -> Result<(), HostCallError> {
        let object = self.owned(object)?;
        self.check_field(object, field)?;
        object
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(field.name.clone(), value);
        Ok(())
    }

    fn read_static(&self, symbol: &str) -> Option<HostObject> {
        self.statics.get(symbol).cloned()
    }
}
