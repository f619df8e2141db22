//! Resource schemas: field names, types and flags.

use serde::Serialize;

use crate::value::Value;

/// The type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Bool,
    StringList,
    StringMap,
}

impl FieldType {
    /// Returns true if `value` has this type. Null matches every type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (FieldType::String, Value::String(_)) => true,
            (FieldType::Bool, Value::Bool(_)) => true,
            (FieldType::StringList, Value::List(items)) => {
                items.iter().all(|v| matches!(v, Value::String(_)))
            }
            (FieldType::StringMap, Value::Map(entries)) => {
                entries.values().all(|v| matches!(v, Value::String(_)))
            }
            _ => false,
        }
    }

    /// The zero value for this type.
    pub fn zero(&self) -> Value {
        match self {
            FieldType::String => Value::String(String::new()),
            FieldType::Bool => Value::Bool(false),
            FieldType::StringList => Value::List(Vec::new()),
            FieldType::StringMap => Value::Map(Default::default()),
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::String => write!(f, "string"),
            FieldType::Bool => write!(f, "bool"),
            FieldType::StringList => write!(f, "list(string)"),
            FieldType::StringMap => write!(f, "map(string)"),
        }
    }
}

/// Schema of a single field.
#[derive(Debug, Clone, Serialize)]
pub struct FieldSchema {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    pub optional: bool,
    /// Set by the remote side rather than declared.
    pub computed: bool,
    /// Never rendered in plans or logs.
    pub sensitive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    pub description: &'static str,
}

impl FieldSchema {
    fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            required: false,
            optional: false,
            computed: false,
            sensitive: false,
            default: None,
            description: "",
        }
    }

    pub fn required(name: &'static str, field_type: FieldType) -> Self {
        Self {
            required: true,
            ..Self::new(name, field_type)
        }
    }

    pub fn optional(name: &'static str, field_type: FieldType) -> Self {
        Self {
            optional: true,
            ..Self::new(name, field_type)
        }
    }

    pub fn computed(name: &'static str, field_type: FieldType) -> Self {
        Self {
            computed: true,
            ..Self::new(name, field_type)
        }
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Whether users may set this field in a manifest.
    pub fn is_declarable(&self) -> bool {
        self.required || self.optional
    }

    /// The value used when the field is absent: the default if any,
    /// else the type's zero value.
    pub fn empty_value(&self) -> Value {
        self.default
            .clone()
            .unwrap_or_else(|| self.field_type.zero())
    }
}

/// Schema of a resource type. Field order is declaration order.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceSchema {
    pub type_name: &'static str,
    pub description: &'static str,
    pub fields: Vec<FieldSchema>,
}

impl ResourceSchema {
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            description: "",
            fields: Vec::new(),
        }
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    /// Looks up a field by name.
    pub fn get(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_sensitive(&self, name: &str) -> bool {
        self.get(name).is_some_and(|f| f.sensitive)
    }

    /// Fields that can appear in a declaration.
    pub fn declarable_fields(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields.iter().filter(|f| f.is_declarable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResourceSchema {
        ResourceSchema::new("sample")
            .field(FieldSchema::computed("id", FieldType::String))
            .field(FieldSchema::required("url", FieldType::String))
            .field(FieldSchema::optional("disabled", FieldType::Bool).with_default(false))
            .field(FieldSchema::computed("secret", FieldType::String).sensitive())
    }

    #[test]
    fn test_field_type_accepts() {
        assert!(FieldType::String.accepts(&Value::from("x")));
        assert!(FieldType::String.accepts(&Value::Null));
        assert!(!FieldType::String.accepts(&Value::Bool(true)));
        assert!(FieldType::StringList.accepts(&Value::from(vec!["a".to_string()])));
        assert!(!FieldType::StringList.accepts(&Value::List(vec![Value::Bool(true)])));
    }

    #[test]
    fn test_schema_lookup_and_flags() {
        let schema = sample();
        assert!(schema.get("url").unwrap().required);
        assert!(schema.is_sensitive("secret"));
        assert!(!schema.is_sensitive("url"));
        assert!(schema.get("missing").is_none());

        let declarable: Vec<_> = schema.declarable_fields().map(|f| f.name).collect();
        assert_eq!(declarable, vec!["url", "disabled"]);
    }

    #[test]
    fn test_empty_value_prefers_default() {
        let schema = sample();
        assert_eq!(schema.get("disabled").unwrap().empty_value(), Value::Bool(false));
        assert_eq!(schema.get("url").unwrap().empty_value(), Value::from(""));
    }
}
