//! Lazy pre-order enumeration and cursor navigation.

use crate::domain::arena::TreeArena;
use crate::domain::node::{NodeId, TreeNode};
use crate::domain::projection::TreeProjection;
use crate::domain::record::FieldAccess;

/// Depth-first pre-order walk over visible nodes and group headers.
///
/// Every call to [`TreeProjection::enumerate`] starts from the top and
/// reflects the current graph. The `expanded` flag is not consulted.
pub struct Enumeration<'a, R> {
    arena: &'a TreeArena<R>,
    stack: Vec<NodeId>,
}

impl<'a, R> Iterator for Enumeration<'a, R> {
    type Item = (NodeId, &'a TreeNode<R>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(node) = self.arena.get_node(current) {
                self.stack.extend(node.layout.iter().rev().copied());
                return Some((current, node));
            }
        }
        None
    }
}

impl<R: FieldAccess> TreeProjection<R> {
    pub fn enumerate(&self) -> Enumeration<'_, R> {
        let stack = if self.options.root_enumerable {
            vec![self.root]
        } else {
            self.arena
                .get_node(self.root)
                .map(|root| root.layout.iter().rev().copied().collect())
                .unwrap_or_default()
        };
        Enumeration {
            arena: &self.arena,
            stack,
        }
    }

    /// Enumerated nodes without group headers.
    fn navigable(&self) -> Vec<NodeId> {
        self.enumerate()
            .filter(|(_, node)| !node.is_group())
            .map(|(id, _)| id)
            .collect()
    }
}

/// Position in a projection's enumeration.
///
/// A fresh cursor sits before the first element. Moves that would leave
/// the enumeration return `false` and keep the position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeCursor {
    current: Option<NodeId>,
}

impl TreeCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(id: NodeId) -> Self {
        Self { current: Some(id) }
    }

    pub fn current(&self) -> Option<NodeId> {
        self.current
    }

    pub fn reset(&mut self) {
        self.current = None;
    }

    pub fn move_to_next<R: FieldAccess>(&mut self, tree: &TreeProjection<R>) -> bool {
        let order = tree.navigable();
        let next = match self.current {
            None => order.first().copied(),
            Some(current) => order
                .iter()
                .position(|&id| id == current)
                .and_then(|i| order.get(i + 1).copied()),
        };
        self.land(next)
    }

    pub fn move_to_previous<R: FieldAccess>(&mut self, tree: &TreeProjection<R>) -> bool {
        let Some(current) = self.current else {
            return false;
        };
        let order = tree.navigable();
        let previous = order
            .iter()
            .position(|&id| id == current)
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| order.get(i).copied());
        self.land(previous)
    }

    /// Step to the parent, unless the parent is a hidden root.
    pub fn move_to_above<R: FieldAccess>(&mut self, tree: &TreeProjection<R>) -> bool {
        let parent = self
            .current
            .and_then(|id| tree.arena().get_node(id))
            .and_then(|node| node.parent);
        let visible = parent.filter(|&p| p != tree.root() || tree.is_root_enumerable());
        self.land(visible)
    }

    /// Step to the first visible record child.
    pub fn move_to_below<R: FieldAccess>(&mut self, tree: &TreeProjection<R>) -> bool {
        let child = self
            .current
            .and_then(|id| tree.children_of(id).ok())
            .and_then(|children| children.first().copied());
        self.land(child)
    }

    fn land(&mut self, target: Option<NodeId>) -> bool {
        match target {
            Some(id) => {
                self.current = Some(id);
                true
            }
            None => false,
        }
    }
}
