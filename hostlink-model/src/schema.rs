use std::collections::BTreeSet;

use crate::error::{ModelError, ModelResult};

/// The fields an adapter depends on for one host type.
///
/// A contract is declared once and checked when the registry resolves it.
/// For `exact` contracts the host's externally-writable instance fields must
/// equal the declared set; anything else is drift.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaContract {
    type_name: String,
    parent: Option<String>,
    fields: BTreeSet<String>,
    exact: bool,
    constructible: bool,
}

impl SchemaContract {
    /// A lenient contract: the named fields must exist, extra fields are fine.
    pub fn new<I, S>(type_name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            type_name: type_name.into(),
            parent: None,
            fields: fields.into_iter().map(Into::into).collect(),
            exact: false,
            constructible: false,
        }
    }

    /// Requires the writable field set to match exactly.
    #[must_use]
    pub fn exact(mut self) -> Self {
        self.exact = true;
        self
    }

    /// Requires a parameterless constructor, checked at resolution.
    #[must_use]
    pub fn constructible(mut self) -> Self {
        self.constructible = true;
        self
    }

    /// Looks the type up as a nested type of `parent` rather than by full
    /// name. `type_name` is then the simple name inside the parent.
    #[must_use]
    pub fn nested_in(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn fields(&self) -> &BTreeSet<String> {
        &self.fields
    }

    pub fn is_exact(&self) -> bool {
        self.exact
    }

    pub fn is_constructible(&self) -> bool {
        self.constructible
    }

    /// Compares the declared set against the host's writable set.
    ///
    /// Both sides of the difference are reported, sorted, under the resolved
    /// type's full name.
    pub fn check_drift(&self, resolved_name: &str, actual: &BTreeSet<String>) -> ModelResult<()> {
        if &self.fields == actual {
            return Ok(());
        }
        Err(ModelError::SchemaDrift {
            type_name: resolved_name.to_string(),
            added: actual.difference(&self.fields).cloned().collect(),
            missing: self.fields.difference(actual).cloned().collect(),
        })
    }
}
