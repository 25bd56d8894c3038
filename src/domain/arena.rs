use generational_arena::Arena;
use tracing::instrument;

use crate::domain::node::{NodeContents, NodeId, TreeNode};
use crate::domain::record::Value;

/// Arena-based tree structure for the projected hierarchy.
///
/// The arena owns every node. Structure flows root→children through
/// `children`; the child→parent edge is a plain index, so the tree never
/// forms an ownership cycle.
#[derive(Debug)]
pub struct TreeArena<R> {
    /// Arena storage for all tree nodes
    arena: Arena<TreeNode<R>>,
    /// Index of the root node, None for empty trees
    root: Option<NodeId>,
}

impl<R> Default for TreeArena<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> TreeArena<R> {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
        }
    }

    /// Insert a node. Without a parent the node becomes the root; with one it
    /// is appended to the parent's children.
    #[instrument(level = "trace", skip(self, contents))]
    pub fn insert_node(&mut self, contents: NodeContents<R>, parent: Option<NodeId>) -> NodeId {
        let node_idx = NodeId(self.arena.insert(TreeNode::new(contents, parent)));

        if let Some(parent_idx) = parent {
            if let Some(parent) = self.arena.get_mut(parent_idx.0) {
                parent.children.push(node_idx);
            }
        } else {
            self.root = Some(node_idx);
        }

        node_idx
    }

    /// Insert a node that is not linked anywhere yet.
    pub(crate) fn insert_detached(&mut self, contents: NodeContents<R>) -> NodeId {
        NodeId(self.arena.insert(TreeNode::new(contents, None)))
    }

    /// Insert a group header owned by `parent`. Headers live in the parent's
    /// layout only, never in its children.
    pub(crate) fn insert_group(&mut self, key: Value, parent: NodeId, level: usize) -> NodeId {
        let mut node = TreeNode::new(NodeContents::Group(key), Some(parent));
        node.level = level;
        NodeId(self.arena.insert(node))
    }

    pub fn get_node(&self, idx: NodeId) -> Option<&TreeNode<R>> {
        self.arena.get(idx.0)
    }

    pub fn get_node_mut(&mut self, idx: NodeId) -> Option<&mut TreeNode<R>> {
        self.arena.get_mut(idx.0)
    }

    pub fn contains(&self, idx: NodeId) -> bool {
        self.arena.contains(idx.0)
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.arena.clear();
        self.root = None;
    }

    /// Link `child` as the last child of `parent`.
    pub(crate) fn attach(&mut self, child: NodeId, parent: NodeId) {
        if let Some(node) = self.arena.get_mut(child.0) {
            node.parent = Some(parent);
        }
        if let Some(parent) = self.arena.get_mut(parent.0) {
            parent.children.push(child);
        }
    }

    /// Unlink `child` from its parent's children and layout.
    /// Returns the former parent.
    pub(crate) fn detach(&mut self, child: NodeId) -> Option<NodeId> {
        let parent = self.arena.get_mut(child.0)?.parent.take()?;
        if let Some(parent_node) = self.arena.get_mut(parent.0) {
            parent_node.children.retain(|&c| c != child);
            parent_node.layout.retain(|&c| c != child);
        }
        Some(parent)
    }

    /// Pre-order walk over record structure (children, hidden ones included).
    pub fn iter(&self) -> TreeIterator<'_, R> {
        TreeIterator::new(self, self.root)
    }

    /// Ids of the subtree rooted at `start`, `start` first.
    pub fn subtree(&self, start: NodeId) -> Vec<NodeId> {
        TreeIterator::new(self, Some(start)).map(|(idx, _)| idx).collect()
    }

    /// Remove a node, its descendants and all group headers they own.
    ///
    /// Returns the removed nodes in post-order.
    #[instrument(level = "trace", skip(self))]
    pub(crate) fn remove_subtree(&mut self, start: NodeId) -> Vec<(NodeId, TreeNode<R>)> {
        self.detach(start);
        let order: Vec<NodeId> = PostOrderIterator::new(self, Some(start))
            .map(|(idx, _)| idx)
            .collect();

        let mut removed = Vec::with_capacity(order.len());
        for idx in order {
            let groups: Vec<NodeId> = self
                .get_node(idx)
                .map(|n| {
                    n.layout
                        .iter()
                        .copied()
                        .filter(|&g| self.get_node(g).is_some_and(|g| g.is_group()))
                        .collect()
                })
                .unwrap_or_default();
            for group in groups {
                if let Some(node) = self.arena.remove(group.0) {
                    removed.push((group, node));
                }
            }
            if let Some(node) = self.arena.remove(idx.0) {
                removed.push((idx, node));
            }
        }
        if self.root == Some(start) {
            self.root = None;
        }
        removed
    }
}

pub struct TreeIterator<'a, R> {
    arena: &'a TreeArena<R>,
    stack: Vec<NodeId>,
}

impl<'a, R> TreeIterator<'a, R> {
    fn new(arena: &'a TreeArena<R>, start: Option<NodeId>) -> Self {
        Self {
            arena,
            stack: start.into_iter().collect(),
        }
    }
}

impl<'a, R> Iterator for TreeIterator<'a, R> {
    type Item = (NodeId, &'a TreeNode<R>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.arena.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}

pub struct PostOrderIterator<'a, R> {
    arena: &'a TreeArena<R>,
    stack: Vec<(NodeId, bool)>,
}

impl<'a, R> PostOrderIterator<'a, R> {
    fn new(arena: &'a TreeArena<R>, start: Option<NodeId>) -> Self {
        Self {
            arena,
            stack: start.into_iter().map(|idx| (idx, false)).collect(),
        }
    }
}

impl<'a, R> Iterator for PostOrderIterator<'a, R> {
    type Item = (NodeId, &'a TreeNode<R>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current_idx, visited)) = self.stack.pop() {
            if let Some(node) = self.arena.get_node(current_idx) {
                if !visited {
                    self.stack.push((current_idx, true));
                    for &child in node.children.iter().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some((current_idx, node));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::Record;

    fn record(id: i64) -> NodeContents<Record> {
        NodeContents::Record(Record::new().with("id", id))
    }

    //      root
    //      /  \
    //     a    b
    //     |
    //     c
    fn sample() -> (TreeArena<Record>, [NodeId; 4]) {
        let mut tree = TreeArena::new();
        let root = tree.insert_node(
            NodeContents::Root {
                key: None,
                record: None,
            },
            None,
        );
        let a = tree.insert_node(record(1), Some(root));
        let b = tree.insert_node(record(2), Some(root));
        let c = tree.insert_node(record(3), Some(a));
        (tree, [root, a, b, c])
    }

    #[test]
    fn given_tree_when_iterating_then_visits_preorder_and_postorder() {
        let (tree, [root, a, b, c]) = sample();
        let pre: Vec<NodeId> = tree.iter().map(|(i, _)| i).collect();
        assert_eq!(pre, vec![root, a, c, b]);
        let post: Vec<NodeId> = PostOrderIterator::new(&tree, Some(root)).map(|(i, _)| i).collect();
        assert_eq!(post, vec![c, a, b, root]);
    }

    #[test]
    fn given_subtree_when_removed_then_frees_descendants_and_groups() {
        let (mut tree, [root, a, b, c]) = sample();
        let group = tree.insert_group(Value::from("g"), a, 2);
        if let Some(node) = tree.get_node_mut(a) {
            node.layout = vec![group, c];
        }

        let removed: Vec<NodeId> = tree.remove_subtree(a).into_iter().map(|(i, _)| i).collect();

        assert_eq!(removed, vec![c, group, a]);
        assert!(!tree.contains(c));
        assert!(!tree.contains(group));
        assert_eq!(tree.get_node(root).map(|n| n.children.clone()), Some(vec![b]));
    }

    #[test]
    fn given_child_when_detached_and_attached_then_moves_between_parents() {
        let (mut tree, [root, a, b, c]) = sample();
        assert_eq!(tree.detach(c), Some(a));
        tree.attach(c, b);
        assert_eq!(tree.get_node(c).and_then(|n| n.parent), Some(b));
        assert!(tree.get_node(a).is_some_and(|n| n.children.is_empty()));
        assert_eq!(tree.subtree(root), vec![root, a, b, c]);
    }
}
