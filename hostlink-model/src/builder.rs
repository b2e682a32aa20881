use std::sync::Arc;

use hostlink_types::ValueKind;

use crate::error::{ModelError, ModelResult};
use crate::host::{FieldValue, HostModule};
use crate::registry::{FieldHandle, OpaqueInstance, TypeHandle};

/// Creates host instances and moves values in and out of their fields.
///
/// Every access goes through handles the registry produced; the builder
/// checks ownership, accessibility and value kinds before touching the host.
pub struct ObjectBuilder {
    module: Arc<dyn HostModule>,
}

impl ObjectBuilder {
    pub fn new(module: Arc<dyn HostModule>) -> Self {
        Self { module }
    }

    /// Creates an instance with the type's parameterless constructor.
    pub fn create(&self, ty: &TypeHandle) -> ModelResult<OpaqueInstance> {
        if !ty.is_constructible() {
            return Err(ModelError::InstantiationFailed {
                type_name: ty.full_name().to_string(),
                reason: "no parameterless constructor".to_string(),
            });
        }
        let object = self
            .module
            .construct(ty.descriptor())
            .map_err(|e| ModelError::InstantiationFailed {
                type_name: ty.full_name().to_string(),
                reason: e.to_string(),
            })?;
        Ok(OpaqueInstance::adopt(object, ty.clone()))
    }

    pub fn get_field(&self, instance: &OpaqueInstance, field: &FieldHandle) -> ModelResult<FieldValue> {
        check_owner(instance, field)?;
        if !field.descriptor().can_read {
            return Err(access_error(instance, field, "field is not readable"));
        }
        if !field.kind().is_marshalable() {
            return Err(mismatch(field, unsupported_name(field)));
        }

        let value = self.module.read_field(instance.object(), field.descriptor())?;
        match value.kind() {
            None if field.kind().is_nullable() => Ok(value),
            Some(kind) if kind == field.kind() => Ok(value),
            _ => Err(mismatch(field, value.kind_name().to_string())),
        }
    }

    pub fn set_field(
        &self,
        instance: &OpaqueInstance,
        field: &FieldHandle,
        value: FieldValue,
    ) -> ModelResult<()> {
        check_owner(instance, field)?;
        if !field.descriptor().is_externally_writable() {
            return Err(access_error(instance, field, "field is not writable"));
        }
        self.check_value(field, &value)?;
        self.module
            .write_field(instance.object(), field.descriptor(), value)?;
        Ok(())
    }

    fn check_value(&self, field: &FieldHandle, value: &FieldValue) -> ModelResult<()> {
        let expected = field.kind();
        if expected == ValueKind::Unsupported {
            return Err(mismatch(field, value.kind_name().to_string()));
        }
        match value {
            FieldValue::Null if expected.is_nullable() => Ok(()),
            FieldValue::Object(object) if expected == ValueKind::Object => {
                let Some(declared) = field.object_type() else {
                    return Ok(());
                };
                match self.module.type_of(object) {
                    Some(actual) if actual == declared => Ok(()),
                    Some(actual) => Err(mismatch(field, actual)),
                    None => Err(mismatch(field, "foreign object".to_string())),
                }
            }
            other if other.kind() == Some(expected) => Ok(()),
            other => Err(mismatch(field, other.kind_name().to_string())),
        }
    }
}

fn check_owner(instance: &OpaqueInstance, field: &FieldHandle) -> ModelResult<()> {
    if field.owner() == instance.type_handle() {
        Ok(())
    } else {
        Err(access_error(instance, field, "field belongs to another type"))
    }
}

fn access_error(instance: &OpaqueInstance, field: &FieldHandle, reason: &str) -> ModelError {
    ModelError::FieldAccessError {
        field: field.name().to_string(),
        owner: field.owner().full_name().to_string(),
        instance_type: instance.type_handle().full_name().to_string(),
        reason: reason.to_string(),
    }
}

fn mismatch(field: &FieldHandle, found: String) -> ModelError {
    ModelError::TypeMismatch {
        owner: field.owner().full_name().to_string(),
        field: field.name().to_string(),
        expected: field.kind(),
        found,
    }
}

fn unsupported_name(field: &FieldHandle) -> String {
    field
        .object_type()
        .unwrap_or("unsupported host value")
        .to_string()
}
