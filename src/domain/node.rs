//! Tree node model: identifiers, tagged contents and per-node state.

use std::fmt;

use generational_arena::Index;

use crate::domain::record::{FieldAccess, Value};

/// Stable handle of a node inside one projection's arena.
///
/// Handles are generational: a handle to a destroyed node never resolves to
/// a node created later in the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) Index);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (slot, generation) = self.0.into_raw_parts();
        write!(f, "n{slot}.{generation}")
    }
}

/// What a node wraps.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeContents<R> {
    /// A source record (top-level or nested).
    Record(R),
    /// The synthetic root. `key` is what top-level parent keys point at.
    Root { key: Option<Value>, record: Option<R> },
    /// A group header heading one run of siblings.
    Group(Value),
}

/// Tree node in the arena-based hierarchy.
#[derive(Debug)]
pub struct TreeNode<R> {
    pub(crate) contents: NodeContents<R>,
    /// Index of parent node in the arena, None for the root
    pub(crate) parent: Option<NodeId>,
    /// Record children in arranged order
    pub(crate) children: Vec<NodeId>,
    /// Visible children with group headers, in enumeration order
    pub(crate) layout: Vec<NodeId>,
    pub(crate) level: usize,
    /// Natural position among nested siblings (materialized nesting only)
    pub(crate) ordinal: usize,
    pub(crate) expanded: bool,
    pub(crate) uid: String,
    /// Key chain the uid was derived from, before any suffix
    pub(crate) uid_base: String,
}

impl<R> TreeNode<R> {
    pub(crate) fn new(contents: NodeContents<R>, parent: Option<NodeId>) -> Self {
        Self {
            contents,
            parent,
            children: Vec::new(),
            layout: Vec::new(),
            level: 0,
            ordinal: 0,
            expanded: false,
            uid: String::new(),
            uid_base: String::new(),
        }
    }

    pub fn contents(&self) -> &NodeContents<R> {
        &self.contents
    }

    /// The wrapped record; `None` for groups and an anonymous root.
    pub fn record(&self) -> Option<&R> {
        match &self.contents {
            NodeContents::Record(r) => Some(r),
            NodeContents::Root { record, .. } => record.as_ref(),
            NodeContents::Group(_) => None,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn layout(&self) -> &[NodeId] {
        &self.layout
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn is_root(&self) -> bool {
        matches!(self.contents, NodeContents::Root { .. })
    }

    pub fn is_group(&self) -> bool {
        matches!(self.contents, NodeContents::Group(_))
    }

    pub fn is_record(&self) -> bool {
        matches!(self.contents, NodeContents::Record(_))
    }

    pub fn group_key(&self) -> Option<&Value> {
        match &self.contents {
            NodeContents::Group(key) => Some(key),
            _ => None,
        }
    }
}

impl<R: FieldAccess> TreeNode<R> {
    /// Key of a record node, or the root key.
    pub fn key(&self, key_field: &str) -> Option<Value> {
        match &self.contents {
            NodeContents::Record(r) => r.field(key_field),
            NodeContents::Root { key, .. } => key.clone(),
            NodeContents::Group(_) => None,
        }
    }

    /// Node/leaf classification.
    ///
    /// An explicit flag field wins over structure, so a flagged record stays
    /// a node while it has no children.
    pub(crate) fn classify(&self, node_field: Option<&str>, has_visible_children: bool) -> bool {
        match &self.contents {
            NodeContents::Root { .. } => true,
            NodeContents::Group(_) => false,
            NodeContents::Record(r) => match node_field.and_then(|f| r.field(f)) {
                Some(flag) => flag.is_truthy(),
                None => has_visible_children,
            },
        }
    }
}
