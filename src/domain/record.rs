//! Record abstraction: scalar values, field access, and a map-backed record.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Scalar value read from a record field.
///
/// Keys, parent keys, group keys and sort fields are all `Value`s, so the
/// type is totally ordered and hashable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl Value {
    /// Truthiness used by node flags and field filters.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Str(s) => !s.is_empty(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

/// Capability the projection needs from a record type.
///
/// Fields are looked up by name at runtime; which names mean "key",
/// "parent key" and so on is decided by `ProjectionOptions`.
pub trait FieldAccess: Clone + fmt::Debug {
    /// Scalar value of a field, `None` when absent.
    fn field(&self, name: &str) -> Option<Value>;

    /// Nested child records stored under a field (materialized nesting).
    fn nested(&self, name: &str) -> Option<Vec<Self>>;

    /// Overwrite a scalar field in place.
    fn set_field(&mut self, name: &str, value: Value);
}

/// One field of a [`Record`]: a scalar or a nested list of records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Field {
    Scalar(Value),
    Nested(Vec<Record>),
}

/// Map-backed record, deserializable from a TOML table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, Field>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style scalar setter.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields
            .insert(name.to_string(), Field::Scalar(value.into()));
        self
    }

    /// Builder-style nested children setter.
    pub fn with_nested(mut self, name: &str, children: Vec<Record>) -> Self {
        self.fields.insert(name.to_string(), Field::Nested(children));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        match self.fields.get(name) {
            Some(Field::Scalar(v)) => Some(v),
            _ => None,
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Field> {
        self.fields.remove(name)
    }
}

impl FieldAccess for Record {
    fn field(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }

    fn nested(&self, name: &str) -> Option<Vec<Self>> {
        match self.fields.get(name) {
            Some(Field::Nested(children)) => Some(children.clone()),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), Field::Scalar(value));
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scalars: Vec<String> = self
            .fields
            .iter()
            .filter_map(|(name, field)| match field {
                Field::Scalar(v) => Some(format!("{name}={v}")),
                Field::Nested(_) => None,
            })
            .collect();
        write!(f, "{{{}}}", scalars.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_toml_table_when_deserializing_then_reads_scalars_and_nested() {
        let src = r#"
id = 1
name = "top"
node = true
children = [{ id = 2 }, { id = 3 }]
"#;
        let record: Record = toml::from_str(src).expect("parse record");
        assert_eq!(record.field("id"), Some(Value::Int(1)));
        assert_eq!(record.field("name"), Some(Value::from("top")));
        assert_eq!(record.field("node"), Some(Value::Bool(true)));
        let nested = record.nested("children").expect("nested children");
        assert_eq!(nested.len(), 2);
        assert_eq!(nested[1].field("id"), Some(Value::Int(3)));
    }

    #[test]
    fn given_values_when_checking_truthiness_then_follows_type() {
        assert!(Value::Int(3).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::Bool(true).is_truthy());
    }

    #[test]
    fn given_record_when_displayed_then_lists_scalars() {
        let record = Record::new().with("id", 1).with("pid", 0);
        assert_eq!(record.to_string(), "{id=1, pid=0}");
    }
}
