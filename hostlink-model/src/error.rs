//! Error types for the structural adapter.

use hostlink_types::ValueKind;
use thiserror::Error;

/// Diagnostic text raised by the host itself, passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct HostCallError(pub String);

impl HostCallError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("type {type_name} not found in module {module}")]
    TypeNotFound { module: String, type_name: String },

    #[error("{type_name} is missing fields: {}", missing.join(", "))]
    FieldNotFound {
        type_name: String,
        missing: Vec<String>,
    },

    #[error(
        "schema drift in {type_name}: unexpected [{}], missing [{}]",
        added.join(", "),
        missing.join(", ")
    )]
    SchemaDrift {
        type_name: String,
        /// Writable fields the host has but the contract does not declare.
        added: Vec<String>,
        /// Declared fields the host no longer exposes as writable.
        missing: Vec<String>,
    },

    #[error("nested type {nested} not found in {parent}")]
    NestedTypeNotFound { parent: String, nested: String },

    #[error("cannot instantiate {type_name}: {reason}")]
    InstantiationFailed { type_name: String, reason: String },

    #[error("cannot access field {field} of {owner} on a {instance_type} instance: {reason}")]
    FieldAccessError {
        field: String,
        owner: String,
        instance_type: String,
        reason: String,
    },

    #[error("type mismatch on {owner}.{field}: expected {expected}, got {found}")]
    TypeMismatch {
        owner: String,
        field: String,
        expected: ValueKind,
        found: String,
    },

    #[error("host error: {0}")]
    Host(#[from] HostCallError),
}

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;
