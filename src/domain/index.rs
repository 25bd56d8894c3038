//! Projected index <-> node <-> source index mapping.
//!
//! Every query walks the current enumeration, so each call is linear in the
//! number of visible nodes.

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node::NodeId;
use crate::domain::projection::TreeProjection;
use crate::domain::record::FieldAccess;

impl<R: FieldAccess> TreeProjection<R> {
    /// Number of enumerated entries, group headers included.
    pub fn len(&self) -> usize {
        self.enumerate().count()
    }

    pub fn is_empty(&self) -> bool {
        self.enumerate().next().is_none()
    }

    /// Projected index of `id`; `None` while the node is filtered out or
    /// is the hidden root.
    pub fn index_of(&self, id: NodeId) -> DomainResult<Option<usize>> {
        if !self.arena.contains(id) {
            return Err(DomainError::UnknownNode(id));
        }
        Ok(self.enumerate().position(|(n, _)| n == id))
    }

    pub fn node_at(&self, index: usize) -> Option<NodeId> {
        self.enumerate().nth(index).map(|(id, _)| id)
    }

    /// Source index behind a projected index. `None` for the root, group
    /// headers, nested records and positions past the end.
    pub fn source_index_of(&self, index: usize) -> Option<usize> {
        let id = self.node_at(index)?;
        self.order.iter().position(|&n| n == id)
    }

    pub fn projected_index_of_source(&self, source_index: usize) -> Option<usize> {
        let id = *self.order.get(source_index)?;
        self.enumerate().position(|(n, _)| n == id)
    }

    /// Node of the record at `source_index`.
    pub fn node_of_source(&self, source_index: usize) -> Option<NodeId> {
        self.order.get(source_index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::arrange::group_by_field;
    use crate::domain::options::ProjectionOptions;
    use crate::domain::record::Record;

    #[test]
    fn given_root_and_groups_when_mapping_then_synthetic_nodes_have_no_source() {
        let records = vec![
            Record::new().with("id", 1).with("pid", 0).with("g", "a"),
            Record::new().with("id", 2).with("pid", 0).with("g", "a"),
        ];
        let options = ProjectionOptions::adjacency("id", "pid")
            .with_root_key(0)
            .with_root_enumerable(true);
        let mut tree = TreeProjection::new(options, records).expect("build");
        tree.set_group(Some(group_by_field("g")));

        // root, [a], 1, 2
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.source_index_of(0), None);
        assert_eq!(tree.source_index_of(1), None);
        assert_eq!(tree.source_index_of(2), Some(0));
        assert_eq!(tree.source_index_of(3), Some(1));
        assert_eq!(tree.source_index_of(4), None);
        assert_eq!(tree.projected_index_of_source(1), Some(3));
        assert_eq!(tree.index_of(tree.root()), Ok(Some(0)));
    }
}
