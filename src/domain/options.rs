//! Construction-time configuration of a projection.

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::record::{FieldAccess, Value};

/// How the source encodes hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Linkage {
    /// Adjacency list: each record names its parent's key in this field.
    ParentKey(String),
    /// Materialized nesting: each record carries its children in this field.
    Children(String),
}

/// What the synthetic root stands for.
#[derive(Debug, Clone, PartialEq)]
pub enum RootSpec<R> {
    /// No key; only unresolvable parent keys land on the root.
    Anonymous,
    /// Top-level records carry this value as their parent key.
    Key(Value),
    /// Root backed by a record; its key field is the root key.
    Record(R),
}

#[derive(Debug, Clone)]
pub struct ProjectionOptions<R> {
    pub key_field: String,
    pub linkage: Linkage,
    /// Explicit node/leaf flag field
    pub node_field: Option<String>,
    pub root: RootSpec<R>,
    pub root_enumerable: bool,
}

impl<R> Default for ProjectionOptions<R> {
    fn default() -> Self {
        Self {
            key_field: "id".into(),
            linkage: Linkage::ParentKey("pid".into()),
            node_field: None,
            root: RootSpec::Anonymous,
            root_enumerable: false,
        }
    }
}

impl<R: FieldAccess> ProjectionOptions<R> {
    /// Adjacency-list options with the given key and parent-key fields.
    pub fn adjacency(key_field: &str, parent_key_field: &str) -> Self {
        Self {
            key_field: key_field.into(),
            linkage: Linkage::ParentKey(parent_key_field.into()),
            ..Self::default()
        }
    }

    /// Materialized-nesting options with the given key and children fields.
    pub fn nested(key_field: &str, children_field: &str) -> Self {
        Self {
            key_field: key_field.into(),
            linkage: Linkage::Children(children_field.into()),
            ..Self::default()
        }
    }

    pub fn with_root_key(mut self, key: impl Into<Value>) -> Self {
        self.root = RootSpec::Key(key.into());
        self
    }

    pub fn with_root_record(mut self, record: R) -> Self {
        self.root = RootSpec::Record(record);
        self
    }

    pub fn with_node_field(mut self, field: &str) -> Self {
        self.node_field = Some(field.into());
        self
    }

    pub fn with_root_enumerable(mut self, enumerable: bool) -> Self {
        self.root_enumerable = enumerable;
        self
    }

    pub fn parent_key_field(&self) -> Option<&str> {
        match &self.linkage {
            Linkage::ParentKey(field) => Some(field),
            Linkage::Children(_) => None,
        }
    }

    pub fn children_field(&self) -> Option<&str> {
        match &self.linkage {
            Linkage::Children(field) => Some(field),
            Linkage::ParentKey(_) => None,
        }
    }

    /// Key the root answers to, validated against the key field.
    pub(crate) fn root_key(&self) -> DomainResult<Option<Value>> {
        match &self.root {
            RootSpec::Anonymous => Ok(None),
            RootSpec::Key(key) => Ok(Some(key.clone())),
            RootSpec::Record(record) => record.field(&self.key_field).map(Some).ok_or_else(|| {
                DomainError::MissingField {
                    field: self.key_field.clone(),
                }
            }),
        }
    }

    pub(crate) fn validate(&self) -> DomainResult<()> {
        if self.key_field.is_empty() {
            return Err(DomainError::InvalidArgument("key field must not be empty".into()));
        }
        let linkage_field = match &self.linkage {
            Linkage::ParentKey(field) | Linkage::Children(field) => field,
        };
        if linkage_field.is_empty() {
            return Err(DomainError::InvalidArgument(
                "linkage field must not be empty".into(),
            ));
        }
        if *linkage_field == self.key_field {
            return Err(DomainError::InvalidArgument(format!(
                "linkage field '{linkage_field}' must differ from the key field"
            )));
        }
        self.root_key().map(|_| ())
    }
}
