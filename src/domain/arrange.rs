//! Per-sibling-list ordering, filtering and group header injection.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use tracing::instrument;

use crate::domain::change::ProjectionChange;
use crate::domain::node::{NodeId, TreeNode};
use crate::domain::projection::TreeProjection;
use crate::domain::record::{FieldAccess, Value};
use crate::domain::uid::key_chain;

/// One sibling as seen by a comparator.
pub struct SortEntry<'a, R> {
    pub node: &'a TreeNode<R>,
    /// Natural rank: source index, or position inside the nesting record.
    pub position: usize,
}

impl<'a, R> SortEntry<'a, R> {
    pub fn record(&self) -> Option<&'a R> {
        self.node.record()
    }
}

pub type Comparator<R> = Box<dyn Fn(&SortEntry<'_, R>, &SortEntry<'_, R>) -> Ordering>;
pub type GroupKeyFn<R> = Box<dyn Fn(&R) -> Option<Value>>;
pub type FilterFn<R> = Box<dyn Fn(&R) -> bool>;

/// Active sort, group and filter rules.
pub struct Arrangement<R> {
    pub(crate) sort: Option<Comparator<R>>,
    pub(crate) group: Option<GroupKeyFn<R>>,
    pub(crate) filter: Option<FilterFn<R>>,
}

impl<R> Default for Arrangement<R> {
    fn default() -> Self {
        Self {
            sort: None,
            group: None,
            filter: None,
        }
    }
}

impl<R> fmt::Debug for Arrangement<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arrangement")
            .field("sort", &self.sort.is_some())
            .field("group", &self.group.is_some())
            .field("filter", &self.filter.is_some())
            .finish()
    }
}

/// Order siblings by a scalar field; records without the field sort first.
pub fn sort_by_field<R: FieldAccess + 'static>(field: &str, descending: bool) -> Comparator<R> {
    let field = field.to_string();
    Box::new(move |a, b| {
        let left = a.record().and_then(|r| r.field(&field));
        let right = b.record().and_then(|r| r.field(&field));
        let ordering = left.cmp(&right);
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    })
}

pub fn group_by_field<R: FieldAccess + 'static>(field: &str) -> GroupKeyFn<R> {
    let field = field.to_string();
    Box::new(move |record| record.field(&field))
}

/// Keep records whose field is truthy.
pub fn filter_by_field<R: FieldAccess + 'static>(field: &str) -> FilterFn<R> {
    let field = field.to_string();
    Box::new(move |record| record.field(&field).is_some_and(|v| v.is_truthy()))
}

/// Cluster `ids` into runs by key, in first-appearance order of the key.
fn cluster(
    ids: Vec<NodeId>,
    key_of: impl Fn(NodeId) -> Option<Value>,
) -> Vec<(Option<Value>, Vec<NodeId>)> {
    let mut runs: Vec<(Option<Value>, Vec<NodeId>)> = Vec::new();
    for id in ids {
        let key = key_of(id);
        match runs.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(id),
            None => runs.push((key, vec![id])),
        }
    }
    runs
}

impl<R: FieldAccess> TreeProjection<R> {
    pub fn set_sort(&mut self, sort: Option<Comparator<R>>) -> Vec<ProjectionChange> {
        self.reproject(|projection| {
            projection.rules.sort = sort;
            projection.rearrange_all();
        })
    }

    pub fn set_group(&mut self, group: Option<GroupKeyFn<R>>) -> Vec<ProjectionChange> {
        self.reproject(|projection| {
            projection.rules.group = group;
            projection.rearrange_all();
        })
    }

    pub fn set_filter(&mut self, filter: Option<FilterFn<R>>) -> Vec<ProjectionChange> {
        self.reproject(|projection| {
            projection.rules.filter = filter;
            projection.rearrange_all();
        })
    }

    pub fn arrangement(&self) -> &Arrangement<R> {
        &self.rules
    }

    #[instrument(level = "debug", skip(self))]
    pub(crate) fn rearrange_all(&mut self) {
        let positions = self.positions();
        for parent in self.arena.subtree(self.root) {
            self.arrange(parent, &positions);
        }
    }

    fn passes_filter(&self, id: NodeId) -> bool {
        match (&self.rules.filter, self.arena.get_node(id).and_then(|n| n.record())) {
            (Some(filter), Some(record)) => filter(record),
            _ => true,
        }
    }

    /// Natural rank of a sibling: source index, else nesting ordinal.
    fn rank(&self, id: NodeId, positions: &HashMap<NodeId, usize>) -> usize {
        positions
            .get(&id)
            .copied()
            .or_else(|| self.arena.get_node(id).map(|n| n.ordinal))
            .unwrap_or(usize::MAX)
    }

    /// Re-derive `children` and `layout` of one parent.
    pub(crate) fn arrange(&mut self, parent: NodeId, positions: &HashMap<NodeId, usize>) {
        let Some(node) = self.arena.get_node(parent) else {
            return;
        };
        if node.is_group() {
            return;
        }
        let level = node.level + 1;
        let mut existing: HashMap<Value, NodeId> = node
            .layout
            .iter()
            .filter_map(|&g| {
                let group = self.arena.get_node(g)?;
                group.group_key().map(|key| (key.clone(), g))
            })
            .collect();

        let mut children = node.children.clone();
        children.sort_by_key(|&id| self.rank(id, positions));
        if let Some(sort) = &self.rules.sort {
            children.sort_by(|&a, &b| match (self.arena.get_node(a), self.arena.get_node(b)) {
                (Some(left), Some(right)) => sort(
                    &SortEntry {
                        node: left,
                        position: self.rank(a, positions),
                    },
                    &SortEntry {
                        node: right,
                        position: self.rank(b, positions),
                    },
                ),
                _ => Ordering::Equal,
            });
        }

        let visible: Vec<NodeId> = children
            .iter()
            .copied()
            .filter(|&id| self.passes_filter(id))
            .collect();
        let runs = match &self.rules.group {
            Some(key_fn) => cluster(visible, |id| {
                self.arena
                    .get_node(id)
                    .and_then(|n| n.record())
                    .and_then(|r| key_fn(r))
            }),
            None => vec![(None, visible)],
        };

        let mut layout = Vec::with_capacity(children.len() + runs.len());
        for (key, members) in runs {
            if let Some(key) = key {
                let group = match existing.remove(&key) {
                    Some(group) => group,
                    None => self.spawn_group(key, parent, level),
                };
                if let Some(header) = self.arena.get_node_mut(group) {
                    header.level = level;
                }
                layout.push(group);
            }
            layout.extend(members);
        }

        for (_, stale) in existing {
            for (id, removed) in self.arena.remove_subtree(stale) {
                self.uids.release(&removed.uid, id);
            }
        }
        if let Some(node) = self.arena.get_node_mut(parent) {
            node.children = children;
            node.layout = layout;
        }
    }

    fn spawn_group(&mut self, key: Value, parent: NodeId, level: usize) -> NodeId {
        let group = self.arena.insert_group(key, parent, level);
        let base = key_chain(&self.arena, &self.options.key_field, group);
        let uid = self.uids.acquire(&base, group);
        if let Some(header) = self.arena.get_node_mut(group) {
            header.uid = uid;
            header.uid_base = base;
        }
        group
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::options::ProjectionOptions;
    use crate::domain::record::Record;

    fn labels(projection: &TreeProjection<Record>) -> Vec<String> {
        projection
            .enumerate()
            .map(|(_, node)| match node.group_key() {
                Some(key) => format!("[{key}]"),
                None => node.key("id").map(|k| k.to_string()).unwrap_or_default(),
            })
            .collect()
    }

    fn fixture() -> TreeProjection<Record> {
        let records = vec![
            Record::new().with("id", 1).with("pid", 0).with("g", "x").with("rank", 3),
            Record::new().with("id", 2).with("pid", 0).with("g", "y").with("rank", 1),
            Record::new().with("id", 3).with("pid", 0).with("g", "x").with("rank", 2),
        ];
        TreeProjection::new(ProjectionOptions::adjacency("id", "pid").with_root_key(0), records)
            .expect("build")
    }

    #[test]
    fn given_group_rule_when_set_then_clusters_in_first_appearance_order() {
        let mut projection = fixture();
        projection.set_group(Some(group_by_field("g")));
        assert_eq!(labels(&projection), vec!["[x]", "1", "3", "[y]", "2"]);
    }

    #[test]
    fn given_sort_and_group_when_set_then_sort_decides_run_order() {
        let mut projection = fixture();
        projection.set_sort(Some(sort_by_field("rank", false)));
        projection.set_group(Some(group_by_field("g")));
        assert_eq!(labels(&projection), vec!["[y]", "2", "[x]", "3", "1"]);
    }

    #[test]
    fn given_descending_sort_when_cleared_then_source_order_returns() {
        let mut projection = fixture();
        projection.set_sort(Some(sort_by_field("id", true)));
        assert_eq!(labels(&projection), vec!["3", "2", "1"]);
        projection.set_sort(None);
        assert_eq!(labels(&projection), vec!["1", "2", "3"]);
    }

    #[test]
    fn given_existing_header_when_regrouped_then_header_is_reused() {
        let mut projection = fixture();
        projection.set_group(Some(group_by_field("g")));
        let header = projection.enumerate().next().map(|(id, _)| id);
        projection.set_sort(Some(sort_by_field("id", true)));
        assert_eq!(labels(&projection), vec!["[x]", "3", "1", "[y]", "2"]);
        assert_eq!(projection.enumerate().next().map(|(id, _)| id), header);
    }
}
