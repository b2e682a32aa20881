//! Resolution of schema contracts against a loaded host module.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use hostlink_types::ValueKind;
use tracing::{debug, error};

use crate::error::{ModelError, ModelResult};
use crate::host::{FieldDescriptor, HostModule, HostObject, TypeDescriptor};
use crate::schema::SchemaContract;

/// Run-time reference to a host type. Only the registry creates these.
#[derive(Clone)]
pub struct TypeHandle {
    inner: Arc<TypeDescriptor>,
}

impl TypeHandle {
    pub(crate) fn new(descriptor: TypeDescriptor) -> Self {
        Self {
            inner: Arc::new(descriptor),
        }
    }

    pub fn full_name(&self) -> &str {
        &self.inner.full_name
    }

    pub fn assembly(&self) -> &str {
        &self.inner.assembly
    }

    pub fn qualified_name(&self) -> String {
        self.inner.qualified_name()
    }

    pub fn is_constructible(&self) -> bool {
        self.inner.constructible
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.inner
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.inner.full_name == other.inner.full_name && self.inner.assembly == other.inner.assembly
    }
}

impl Eq for TypeHandle {}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeHandle")
            .field(&self.inner.full_name)
            .finish()
    }
}

/// One instance field of a resolved type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldHandle {
    owner: TypeHandle,
    descriptor: FieldDescriptor,
}

impl FieldHandle {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn kind(&self) -> ValueKind {
        self.descriptor.kind
    }

    pub fn owner(&self) -> &TypeHandle {
        &self.owner
    }

    /// Declared host type of an object-valued field.
    pub fn object_type(&self) -> Option<&str> {
        self.descriptor.type_name.as_deref()
    }

    pub fn descriptor(&self) -> &FieldDescriptor {
        &self.descriptor
    }
}

/// A type handle plus the handles of every field its contract declared.
#[derive(Debug, Clone)]
pub struct ResolvedType {
    handle: TypeHandle,
    fields: BTreeMap<String, FieldHandle>,
}

impl ResolvedType {
    pub fn handle(&self) -> &TypeHandle {
        &self.handle
    }

    pub fn full_name(&self) -> &str {
        self.handle.full_name()
    }

    /// Looks up a declared field.
    pub fn field(&self, name: &str) -> ModelResult<&FieldHandle> {
        self.fields
            .get(name)
            .ok_or_else(|| ModelError::FieldNotFound {
                type_name: self.handle.full_name().to_string(),
                missing: vec![name.to_string()],
            })
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldHandle> {
        self.fields.values()
    }
}

/// A live host value and the type it belongs to.
#[derive(Debug, Clone)]
pub struct OpaqueInstance {
    object: HostObject,
    ty: TypeHandle,
}

impl OpaqueInstance {
    /// Pairs a host value with its resolved type. Callers are expected to
    /// have obtained `object` from the host as a `ty` (construction, decode).
    pub fn adopt(object: HostObject, ty: TypeHandle) -> Self {
        Self { object, ty }
    }

    pub fn object(&self) -> &HostObject {
        &self.object
    }

    pub fn type_handle(&self) -> &TypeHandle {
        &self.ty
    }

    pub fn into_object(self) -> HostObject {
        self.object
    }
}

/// Resolves contracts against one host module and remembers the results.
pub struct TypeRegistry {
    module: Arc<dyn HostModule>,
    types: HashMap<String, ResolvedType>,
}

impl TypeRegistry {
    pub fn new(module: Arc<dyn HostModule>) -> Self {
        Self {
            module,
            types: HashMap::new(),
        }
    }

    pub fn module(&self) -> &Arc<dyn HostModule> {
        &self.module
    }

    /// Resolves `contract`, failing on the first structural problem: a
    /// missing type, drift for exact contracts, any missing declared fields
    /// (all reported at once), then constructibility when required.
    pub fn resolve(&mut self, contract: &SchemaContract) -> ModelResult<ResolvedType> {
        let descriptor = self.lookup(contract)?;
        let handle = TypeHandle::new(descriptor);

        if contract.is_exact() {
            let actual = Self::list_writable_instance_fields(&handle);
            if let Err(drift) = contract.check_drift(handle.full_name(), &actual) {
                error!(type_name = %handle.full_name(), "{drift}");
                return Err(drift);
            }
        }

        let mut fields = BTreeMap::new();
        let mut missing = Vec::new();
        for name in contract.fields() {
            match handle.descriptor().instance_field(name) {
                Some(descriptor) => {
                    fields.insert(
                        name.clone(),
                        FieldHandle {
                            owner: handle.clone(),
                            descriptor: descriptor.clone(),
                        },
                    );
                }
                None => missing.push(name.clone()),
            }
        }
        if !missing.is_empty() {
            return Err(ModelError::FieldNotFound {
                type_name: handle.full_name().to_string(),
                missing,
            });
        }

        if contract.is_constructible() {
            self.check_construction(&handle)?;
        }

        debug!(
            type_name = %handle.full_name(),
            fields = fields.len(),
            "resolved host type"
        );
        let resolved = ResolvedType { handle, fields };
        self.types
            .insert(resolved.full_name().to_string(), resolved.clone());
        Ok(resolved)
    }

    /// Public, writable instance fields of a type, by name.
    pub fn list_writable_instance_fields(ty: &TypeHandle) -> BTreeSet<String> {
        ty.descriptor()
            .fields
            .iter()
            .filter(|f| f.is_externally_writable())
            .map(|f| f.name.clone())
            .collect()
    }

    /// A previously resolved type, by full name.
    pub fn get(&self, full_name: &str) -> Option<&ResolvedType> {
        self.types.get(full_name)
    }

    fn lookup(&self, contract: &SchemaContract) -> ModelResult<TypeDescriptor> {
        let not_found = |type_name: &str| ModelError::TypeNotFound {
            module: self.module.module_name().to_string(),
            type_name: type_name.to_string(),
        };

        match contract.parent() {
            None => self
                .module
                .find_type(contract.type_name())
                .ok_or_else(|| not_found(contract.type_name())),
            Some(parent) => {
                let outer = self.module.find_type(parent).ok_or_else(|| not_found(parent))?;
                self.module
                    .find_nested_type(&outer, contract.type_name())
                    .ok_or_else(|| ModelError::NestedTypeNotFound {
                        parent: parent.to_string(),
                        nested: contract.type_name().to_string(),
                    })
            }
        }
    }

    fn check_construction(&self, handle: &TypeHandle) -> ModelResult<()> {
        if !handle.is_constructible() {
            return Err(ModelError::InstantiationFailed {
                type_name: handle.full_name().to_string(),
                reason: "no parameterless constructor".to_string(),
            });
        }
        self.module
            .construct(handle.descriptor())
            .map(drop)
            .map_err(|e| ModelError::InstantiationFailed {
                type_name: handle.full_name().to_string(),
                reason: e.to_string(),
            })
    }
}
