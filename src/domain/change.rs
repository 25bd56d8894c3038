//! Projected change notifications.

use std::fmt;

use crate::domain::node::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeAction {
    Add,
    Remove,
    Change,
    Move,
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeAction::Add => "add",
            ChangeAction::Remove => "remove",
            ChangeAction::Change => "change",
            ChangeAction::Move => "move",
        };
        f.write_str(name)
    }
}

/// One change of the projected enumeration.
///
/// Indices are sequential: each event is relative to the enumeration as left
/// by the previous event emitted for the same source mutation. Items always
/// form one contiguous range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionChange {
    pub action: ChangeAction,
    pub old_index: Option<usize>,
    pub old_items: Vec<NodeId>,
    pub new_index: Option<usize>,
    pub new_items: Vec<NodeId>,
}

impl ProjectionChange {
    pub fn added(index: usize, items: Vec<NodeId>) -> Self {
        Self {
            action: ChangeAction::Add,
            old_index: None,
            old_items: Vec::new(),
            new_index: Some(index),
            new_items: items,
        }
    }

    pub fn removed(index: usize, items: Vec<NodeId>) -> Self {
        Self {
            action: ChangeAction::Remove,
            old_index: Some(index),
            old_items: items,
            new_index: None,
            new_items: Vec::new(),
        }
    }

    pub fn changed(index: usize, item: NodeId) -> Self {
        Self {
            action: ChangeAction::Change,
            old_index: Some(index),
            old_items: vec![item],
            new_index: Some(index),
            new_items: vec![item],
        }
    }

    pub fn moved(old_index: usize, new_index: usize, items: Vec<NodeId>) -> Self {
        Self {
            action: ChangeAction::Move,
            old_index: Some(old_index),
            old_items: items.clone(),
            new_index: Some(new_index),
            new_items: items,
        }
    }

    /// Nodes this change is about.
    pub fn items(&self) -> &[NodeId] {
        match self.action {
            ChangeAction::Remove => &self.old_items,
            _ => &self.new_items,
        }
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }
}

impl fmt::Display for ProjectionChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.action, self.old_index, self.new_index) {
            (ChangeAction::Move, Some(old), Some(new)) => {
                write!(f, "move {} item(s) {old} -> {new}", self.len())
            }
            (ChangeAction::Remove, Some(old), _) => write!(f, "remove {} item(s) at {old}", self.len()),
            (action, _, Some(new)) => write!(f, "{action} {} item(s) at {new}", self.len()),
            (action, _, None) => write!(f, "{action} {} item(s)", self.len()),
        }
    }
}
