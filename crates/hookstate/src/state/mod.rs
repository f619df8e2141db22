//! Declared and resolved resource state.
//!
//! [`ResourceState`] is the seam between lifecycle handlers and wherever
//! state lives. [`ResourceData`] is the in-memory store used by the
//! planner: it holds the user's declaration, the last resolved state, and
//! the values written during the current operation.

pub mod file;

use std::collections::BTreeMap;

use thiserror::Error;

use crate::diagnostics::Diagnostics;
use crate::schema::{FieldSchema, ResourceSchema};
use crate::value::{self, Value};

pub use file::{StateFile, StateFileError, StoredResource};

/// Attribute maps keyed by schema field name.
pub type Attributes = BTreeMap<String, Value>;

/// Errors raised when reading or writing attributes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("Unknown attribute '{0}'")]
    UnknownField(String),

    #[error("Attribute '{field}' expects {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: String,
        actual: &'static str,
    },

    #[error("Attribute '{0}' is computed and cannot be declared")]
    NotDeclarable(String),

    #[error("Missing required attribute '{0}'")]
    MissingRequired(String),

    #[error("Attribute '{field}' has invalid entry '{key}': {reason}")]
    InvalidEntry {
        field: String,
        key: String,
        reason: &'static str,
    },

    #[error("Failed to persist attribute '{field}': {reason}")]
    Rejected { field: String, reason: String },
}

impl StateError {
    /// The attribute this error refers to.
    pub fn attribute(&self) -> Option<&str> {
        match self {
            StateError::UnknownField(field)
            | StateError::NotDeclarable(field)
            | StateError::MissingRequired(field) => Some(field),
            StateError::TypeMismatch { field, .. }
            | StateError::InvalidEntry { field, .. }
            | StateError::Rejected { field, .. } => Some(field),
        }
    }
}

/// Access to one resource's declared and resolved state.
pub trait ResourceState {
    fn schema(&self) -> &ResourceSchema;

    /// Remote identifier; empty when the resource does not exist.
    fn id(&self) -> &str;

    fn set_id(&mut self, id: &str);

    /// Current value of an attribute: written in this pass, else declared,
    /// else last resolved.
    fn get(&self, key: &str) -> Value;

    /// The declared value, if the user set it to a non-zero value.
    fn get_ok(&self, key: &str) -> Option<Value>;

    /// The last resolved value, ignoring the declaration.
    fn prior(&self, key: &str) -> Value;

    /// Whether the declared value differs from the last resolved one.
    fn has_change(&self, key: &str) -> bool;

    /// Persists a resolved value.
    fn set(&mut self, key: &str, value: Value) -> Result<(), StateError>;

    /// Records the identity of a freshly created resource together with
    /// the values only available at creation. Either everything is
    /// recorded or nothing is.
    fn commit_created(&mut self, id: &str, values: Vec<(&str, Value)>) -> Result<(), StateError>;

    fn string(&self, key: &str) -> String {
        value::to_string(&self.get(key))
    }

    fn bool(&self, key: &str) -> bool {
        value::to_bool(&self.get(key))
    }

    fn string_list(&self, key: &str) -> Vec<String> {
        value::to_string_list(&self.get(key))
    }

    fn string_map(&self, key: &str) -> BTreeMap<String, String> {
        value::to_string_map(&self.get(key))
    }
}

/// Checks a declaration against a schema, reporting every problem.
pub fn validate_declared(schema: &ResourceSchema, declared: &Attributes) -> Vec<StateError> {
    let mut errors = Vec::new();

    for (key, value) in declared {
        match schema.get(key) {
            None => errors.push(StateError::UnknownField(key.clone())),
            Some(field) if !field.is_declarable() => {
                errors.push(StateError::NotDeclarable(key.clone()))
            }
            Some(field) => match check_type(field, value) {
                Ok(()) => errors.extend(check_entries(field, value)),
                Err(e) => errors.push(e),
            },
        }
    }

    for field in schema.fields.iter().filter(|f| f.required) {
        if declared.get(field.name).map_or(true, Value::is_null) {
            errors.push(StateError::MissingRequired(field.name.to_string()));
        }
    }

    errors
}

fn check_type(field: &FieldSchema, value: &Value) -> Result<(), StateError> {
    if field.field_type.accepts(value) {
        Ok(())
    } else {
        Err(StateError::TypeMismatch {
            field: field.name.to_string(),
            expected: field.field_type.to_string(),
            actual: value.type_name(),
        })
    }
}

// Map entries are sent as `field[key]=value` form pairs, where an empty
// value deletes the key remotely.
fn check_entries(field: &FieldSchema, value: &Value) -> Vec<StateError> {
    let Value::Map(entries) = value else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|(key, value)| {
            let reason = if key.is_empty() {
                "keys must not be empty"
            } else if key.contains(['[', ']']) {
                "keys must not contain '[' or ']'"
            } else if value.is_zero() {
                "values must not be empty"
            } else {
                return None;
            };
            Some(StateError::InvalidEntry {
                field: field.name.to_string(),
                key: key.clone(),
                reason,
            })
        })
        .collect()
}

/// In-memory [`ResourceState`].
#[derive(Clone)]
pub struct ResourceData {
    schema: ResourceSchema,
    id: String,
    /// None when there is no declaration (refresh and destroy).
    declared: Option<Attributes>,
    prior: Attributes,
    written: Attributes,
}

impl ResourceData {
    /// Creates an empty store for a resource that does not exist yet.
    pub fn new(schema: ResourceSchema) -> Self {
        Self {
            schema,
            id: String::new(),
            declared: None,
            prior: Attributes::new(),
            written: Attributes::new(),
        }
    }

    /// Loads the last resolved state. Attributes unknown to the schema
    /// are dropped.
    pub fn with_prior(mut self, id: impl Into<String>, attributes: Attributes) -> Self {
        self.id = id.into();
        self.prior = attributes
            .into_iter()
            .filter(|(key, _)| {
                let known = self.schema.get(key).is_some();
                if !known {
                    log::warn!(
                        "Dropping unknown attribute '{}' from {} state",
                        key,
                        self.schema.type_name
                    );
                }
                known
            })
            .collect();
        self
    }

    /// Attaches the user's declaration after validating it.
    pub fn with_declared(mut self, declared: Attributes) -> Result<Self, Diagnostics> {
        let errors = validate_declared(&self.schema, &declared);
        if !errors.is_empty() {
            return Err(errors.into_iter().collect());
        }
        self.declared = Some(declared);
        Ok(self)
    }

    pub fn is_declared(&self) -> bool {
        self.declared.is_some()
    }

    /// Declarable fields whose declared value differs from the resolved one.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        self.schema
            .declarable_fields()
            .filter(|f| self.has_change(f.name))
            .map(|f| f.name)
            .collect()
    }

    /// The resolved attributes after this pass: the prior state with every
    /// written value applied on top.
    pub fn resolved(&self) -> Attributes {
        let mut resolved = self.prior.clone();
        for (key, value) in &self.written {
            resolved.insert(key.clone(), value.clone());
        }
        resolved
    }

    fn declared_value(&self, field: &FieldSchema) -> Option<Value> {
        let declared = self.declared.as_ref()?;
        if !field.is_declarable() {
            return None;
        }
        Some(
            declared
                .get(field.name)
                .filter(|v| !v.is_null())
                .cloned()
                .unwrap_or_else(|| field.default.clone().unwrap_or(Value::Null)),
        )
    }
}

impl ResourceState for ResourceData {
    fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: &str) {
        self.id = id.to_string();
    }

    fn get(&self, key: &str) -> Value {
        let Some(field) = self.schema.get(key) else {
            return Value::Null;
        };
        if let Some(value) = self.written.get(key) {
            return value.clone();
        }
        if let Some(value) = self.declared_value(field) {
            return value;
        }
        self.prior
            .get(key)
            .cloned()
            .unwrap_or_else(|| field.default.clone().unwrap_or(Value::Null))
    }

    fn get_ok(&self, key: &str) -> Option<Value> {
        let field = self.schema.get(key)?;
        self.declared_value(field).filter(|v| !v.is_zero())
    }

    fn prior(&self, key: &str) -> Value {
        self.prior.get(key).cloned().unwrap_or(Value::Null)
    }

    fn has_change(&self, key: &str) -> bool {
        let Some(field) = self.schema.get(key) else {
            return false;
        };
        let Some(declared) = self.declared_value(field) else {
            return false;
        };
        let normalize = |v: Value| if v.is_null() { field.empty_value() } else { v };
        normalize(declared) != normalize(self.prior(key))
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StateError> {
        let field = self
            .schema
            .get(key)
            .ok_or_else(|| StateError::UnknownField(key.to_string()))?;
        check_type(field, &value)?;
        self.written.insert(key.to_string(), value);
        Ok(())
    }

    fn commit_created(&mut self, id: &str, values: Vec<(&str, Value)>) -> Result<(), StateError> {
        for (key, value) in &values {
            let field = self
                .schema
                .get(key)
                .ok_or_else(|| StateError::UnknownField(key.to_string()))?;
            check_type(field, value)?;
        }
        for (key, value) in values {
            self.written.insert(key.to_string(), value);
        }
        self.id = id.to_string();
        Ok(())
    }
}

impl std::fmt::Debug for ResourceData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |attrs: &Attributes| -> BTreeMap<String, Value> {
            attrs
                .iter()
                .map(|(k, v)| {
                    if self.schema.is_sensitive(k) && !v.is_null() {
                        (k.clone(), Value::from("(sensitive value)"))
                    } else {
                        (k.clone(), v.clone())
                    }
                })
                .collect()
        };
        f.debug_struct("ResourceData")
            .field("type", &self.schema.type_name)
            .field("id", &self.id)
            .field("declared", &self.declared.as_ref().map(redact))
            .field("prior", &redact(&self.prior))
            .field("written", &redact(&self.written))
            .finish()
    }
}
