//! Tree builder: full builds and local repair of the node graph.
//!
//! Every repair ends in [`TreeProjection::settle`], which re-levels, re-arranges
//! and re-uids exactly the parts of the graph a mutation touched.

use std::collections::{HashMap, HashSet};

use tracing::{instrument, trace, warn};

use crate::domain::node::{NodeContents, NodeId};
use crate::domain::options::RootSpec;
use crate::domain::projection::TreeProjection;
use crate::domain::record::{FieldAccess, Value};
use crate::domain::translate::Plan;
use crate::domain::uid::key_chain;

impl<R: FieldAccess> TreeProjection<R> {
    /// Drop the whole graph and build it again from `records`.
    #[instrument(level = "debug", skip(self, records), fields(records = records.len()))]
    pub(crate) fn rebuild(&mut self, records: Vec<R>) {
        self.arena.clear();
        self.order.clear();
        self.keys.clear();
        self.uids.clear();

        let root_record = match &self.options.root {
            RootSpec::Record(record) => Some(record.clone()),
            RootSpec::Anonymous | RootSpec::Key(_) => None,
        };
        self.root = self.arena.insert_node(
            NodeContents::Root {
                key: self.root_key.clone(),
                record: root_record,
            },
            None,
        );

        for record in records {
            let id = self.spawn(record);
            self.order.push(id);
        }
        for id in self.order.clone() {
            let parent = self.resolve_parent(id);
            self.arena.attach(id, parent);
        }
        let root = self.root;
        self.settle(&[], &[root], &[]);
    }

    /// Create the node for one top-level record, with its nested subtree in
    /// nesting mode. The node is not linked to a parent yet.
    fn spawn(&mut self, record: R) -> NodeId {
        let id = self.arena.insert_detached(NodeContents::Record(record));
        if self.is_adjacency() {
            self.index_key(id);
        } else {
            self.grow_nested(id);
        }
        id
    }

    /// Wrap the nested children of `start` recursively.
    fn grow_nested(&mut self, start: NodeId) {
        let Some(field) = self.options.children_field().map(str::to_string) else {
            return;
        };
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            let nested = self
                .arena
                .get_node(current)
                .and_then(|n| n.record())
                .and_then(|r| r.nested(&field))
                .unwrap_or_default();
            for (ordinal, child) in nested.into_iter().enumerate() {
                let id = self
                    .arena
                    .insert_node(NodeContents::Record(child), Some(current));
                if let Some(node) = self.arena.get_node_mut(id) {
                    node.ordinal = ordinal;
                }
                stack.push(id);
            }
        }
    }

    fn index_key(&mut self, id: NodeId) {
        if let Some(key) = self.key_of(id) {
            self.keys.entry(key).or_default().push(id);
        }
    }

    fn unindex_key(&mut self, key: &Value, id: NodeId) {
        if let Some(ids) = self.keys.get_mut(key) {
            ids.retain(|&other| other != id);
            if ids.is_empty() {
                self.keys.remove(key);
            }
        }
    }

    fn key_of(&self, id: NodeId) -> Option<Value> {
        self.arena.get_node(id)?.key(&self.options.key_field)
    }

    fn parent_key_of(&self, id: NodeId) -> Option<Value> {
        let field = self.options.parent_key_field()?;
        self.arena.get_node(id)?.record()?.field(field)
    }

    /// Parent a record resolves to under the current source.
    ///
    /// The first record in source order carrying the parent key wins. Missing,
    /// root-valued and unresolvable parent keys land on the root, and so does
    /// a candidate that would close a cycle.
    pub(crate) fn resolve_parent(&self, id: NodeId) -> NodeId {
        let Some(parent_key) = self.parent_key_of(id) else {
            return self.root;
        };
        if self.root_key.as_ref() == Some(&parent_key) {
            return self.root;
        }
        let candidates: Vec<NodeId> = self
            .keys
            .get(&parent_key)
            .map(|ids| ids.iter().copied().filter(|&c| c != id).collect())
            .unwrap_or_default();
        let candidate = match candidates.as_slice() {
            [] => None,
            [only] => Some(*only),
            _ => candidates
                .iter()
                .copied()
                .min_by_key(|c| self.order.iter().position(|o| o == c)),
        };
        match candidate {
            None => {
                if self.key_of(id).as_ref() == Some(&parent_key) {
                    warn!(node = %id, key = %parent_key, "record is its own parent, attaching to root");
                }
                self.root
            }
            Some(candidate) if self.is_ancestor_or_self(id, candidate) => {
                warn!(node = %id, key = %parent_key, "parent key closes a cycle, attaching to root");
                self.root
            }
            Some(candidate) => candidate,
        }
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, mut id: NodeId) -> bool {
        loop {
            if id == ancestor {
                return true;
            }
            match self.arena.get_node(id).and_then(|n| n.parent) {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }

    /// Re-resolve every record whose parent key is one of `keys` and move the
    /// ones whose parent changed.
    ///
    /// A moved dependent can unblock records that were kept at the root for
    /// closing a cycle, so the keys of its subtree are followed as well.
    fn relink(&mut self, keys: &[Value], plan: &mut Plan, touched: &mut Vec<NodeId>) {
        if keys.is_empty() || !self.is_adjacency() {
            return;
        }
        let mut seen: HashSet<Value> = keys.iter().cloned().collect();
        let mut pending: Vec<Value> = keys.to_vec();
        while !pending.is_empty() {
            let batch = std::mem::take(&mut pending);
            let dependents: Vec<NodeId> = self
                .order
                .iter()
                .copied()
                .filter(|&id| self.parent_key_of(id).is_some_and(|pk| batch.contains(&pk)))
                .collect();
            for id in dependents {
                let current = self.arena.get_node(id).and_then(|n| n.parent);
                let resolved = self.resolve_parent(id);
                if current == Some(resolved) {
                    continue;
                }
                trace!(node = %id, parent = %resolved, "relinking dependent");
                let old_parent = self.arena.detach(id);
                self.arena.attach(id, resolved);
                plan.moved.push(id);
                plan.watch.extend(old_parent);
                plan.watch.push(resolved);
                touched.extend(old_parent);
                touched.push(resolved);
                for key in self.subtree_keys(id) {
                    if seen.insert(key.clone()) {
                        pending.push(key);
                    }
                }
            }
        }
    }

    /// Keys of the records in the subtree at `start`.
    fn subtree_keys(&self, start: NodeId) -> Vec<Value> {
        self.arena
            .subtree(start)
            .into_iter()
            .filter(|&id| self.arena.get_node(id).is_some_and(|n| n.is_record()))
            .filter_map(|id| self.key_of(id))
            .collect()
    }

    /// Swap the subtree at `old` for a copy with fresh node ids, keeping the
    /// expanded flags. The copy is detached; the old nodes are destroyed.
    fn rebirth(&mut self, old: NodeId) -> NodeId {
        let old_ids = self.arena.subtree(old);
        let mut mapping: HashMap<NodeId, NodeId> = HashMap::with_capacity(old_ids.len());
        for &id in &old_ids {
            if let Some(node) = self.arena.get_node(id) {
                let (contents, expanded, ordinal) = (node.contents.clone(), node.expanded, node.ordinal);
                let fresh = self.arena.insert_detached(contents);
                if let Some(copy) = self.arena.get_node_mut(fresh) {
                    copy.expanded = expanded;
                    copy.ordinal = ordinal;
                }
                mapping.insert(id, fresh);
            }
        }
        for &id in &old_ids {
            let (Some(&parent), Some(children)) = (
                mapping.get(&id),
                self.arena.get_node(id).map(|n| n.children.clone()),
            ) else {
                continue;
            };
            for child in children {
                if let Some(&copy) = mapping.get(&child) {
                    self.arena.attach(copy, parent);
                }
            }
        }
        for slot in self.order.iter_mut() {
            if let Some(&fresh) = mapping.get(slot) {
                *slot = fresh;
            }
        }
        for ids in self.keys.values_mut() {
            for slot in ids.iter_mut() {
                if let Some(&fresh) = mapping.get(slot) {
                    *slot = fresh;
                }
            }
        }
        self.destroy(old);
        mapping.get(&old).copied().unwrap_or(old)
    }

    /// Remove a subtree from the arena and free its uids.
    fn destroy(&mut self, id: NodeId) {
        for (removed_id, removed) in self.arena.remove_subtree(id) {
            self.uids.release(&removed.uid, removed_id);
        }
    }

    /// Restore level, arrangement and uid invariants after a repair.
    ///
    /// `touched` parents had their membership or a member change, `fresh`
    /// subtrees are new, `moved` subtrees changed parent or key chain.
    pub(crate) fn settle(&mut self, touched: &[NodeId], fresh: &[NodeId], moved: &[NodeId]) {
        let positions = self.positions();
        for &id in fresh.iter().chain(moved) {
            self.relevel(id);
        }
        for &id in fresh {
            for node in self.arena.subtree(id) {
                self.arrange(node, &positions);
            }
        }
        let mut seen = HashSet::new();
        for &id in touched {
            if self.arena.contains(id) && seen.insert(id) {
                self.arrange(id, &positions);
            }
        }
        for &id in fresh.iter().chain(moved) {
            self.assign_uids(id);
        }
    }

    /// Recompute levels of the subtree at `start` from its parent's level.
    fn relevel(&mut self, start: NodeId) {
        let Some(node) = self.arena.get_node(start) else {
            return;
        };
        let base = node
            .parent
            .and_then(|p| self.arena.get_node(p))
            .map_or(0, |p| p.level + 1);
        let mut stack = vec![(start, base)];
        while let Some((id, level)) = stack.pop() {
            let Some(node) = self.arena.get_node_mut(id) else {
                continue;
            };
            node.level = level;
            let children = node.children.clone();
            let layout = node.layout.clone();
            stack.extend(children.into_iter().map(|c| (c, level + 1)));
            stack.extend(
                layout
                    .into_iter()
                    .filter(|&g| self.arena.get_node(g).is_some_and(|n| n.is_group()))
                    .map(|g| (g, level + 1)),
            );
        }
    }

    /// Give every node under `start` (groups included) the uid of its current
    /// key chain. Nodes whose chain is unchanged keep their uid and suffix.
    fn assign_uids(&mut self, start: NodeId) {
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let base = key_chain(&self.arena, &self.options.key_field, id);
            let Some(node) = self.arena.get_node(id) else {
                continue;
            };
            let children = node.children.clone();
            let groups: Vec<NodeId> = node
                .layout
                .iter()
                .copied()
                .filter(|&g| self.arena.get_node(g).is_some_and(|n| n.is_group()))
                .collect();
            if node.uid.is_empty() || node.uid_base != base {
                let previous = node.uid.clone();
                if !previous.is_empty() {
                    self.uids.release(&previous, id);
                }
                let uid = self.uids.acquire(&base, id);
                if let Some(node) = self.arena.get_node_mut(id) {
                    node.uid = uid;
                    node.uid_base = base;
                }
            }
            stack.extend(children.into_iter().rev());
            stack.extend(groups.into_iter().rev());
        }
    }

    pub(crate) fn apply_add(&mut self, index: usize, items: Vec<R>, plan: &mut Plan) {
        let mut fresh = Vec::with_capacity(items.len());
        for (offset, item) in items.into_iter().enumerate() {
            let id = self.spawn(item);
            self.order.insert(index + offset, id);
            fresh.push(id);
        }
        let mut touched = Vec::new();
        let mut keys = Vec::new();
        for &id in &fresh {
            let parent = self.resolve_parent(id);
            self.arena.attach(id, parent);
            touched.push(parent);
            plan.watch.push(parent);
            keys.extend(self.key_of(id));
        }
        self.relink(&keys, plan, &mut touched);
        self.settle(&touched, &fresh, &plan.moved);
    }

    pub(crate) fn apply_remove(&mut self, index: usize, count: usize, plan: &mut Plan) {
        let removed: Vec<NodeId> = self.order.drain(index..index + count).collect();
        let mut touched = Vec::new();
        let mut keys = Vec::new();
        for &id in &removed {
            if let Some(key) = self.key_of(id) {
                self.unindex_key(&key, id);
                keys.push(key);
            }
            if let Some(parent) = self.arena.detach(id) {
                touched.push(parent);
                plan.watch.push(parent);
            }
        }
        self.relink(&keys, plan, &mut touched);
        for id in removed {
            self.destroy(id);
        }
        self.settle(&touched, &[], &plan.moved);
    }

    pub(crate) fn apply_replace(&mut self, index: usize, items: Vec<R>, plan: &mut Plan) {
        let mut touched = Vec::new();
        let mut fresh = Vec::new();
        let mut keys = Vec::new();
        for (offset, item) in items.into_iter().enumerate() {
            let Some(&id) = self.order.get(index + offset) else {
                continue;
            };
            let parent = self.arena.get_node(id).and_then(|n| n.parent);
            if !self.is_adjacency() {
                self.regrow(id, item);
                plan.changed.push(id);
                fresh.push(id);
                touched.extend(parent);
                continue;
            }

            let old_key = self.key_of(id);
            self.set_record(id, item);
            let new_key = self.key_of(id);
            if old_key != new_key {
                keys.extend(old_key);
                keys.extend(new_key);
            }

            let resolved = self.resolve_parent(id);
            if parent == Some(resolved) {
                plan.changed.push(id);
                plan.moved.push(id);
                touched.extend(parent);
            } else {
                self.arena.detach(id);
                let reborn = self.rebirth(id);
                self.arena.attach(reborn, resolved);
                fresh.push(reborn);
                plan.watch.extend(parent);
                plan.watch.push(resolved);
                touched.extend(parent);
                touched.push(resolved);
            }
        }
        self.relink(&keys, plan, &mut touched);
        self.settle(&touched, &fresh, &plan.moved);
    }

    /// Swap the record of `id` and rebuild its nested subtree.
    fn regrow(&mut self, id: NodeId, record: R) {
        let Some(node) = self.arena.get_node_mut(id) else {
            return;
        };
        let children = std::mem::take(&mut node.children);
        let layout = std::mem::take(&mut node.layout);
        node.contents = NodeContents::Record(record);
        for child in children {
            self.destroy(child);
        }
        for stale in layout {
            if self.arena.get_node(stale).is_some_and(|n| n.is_group()) {
                self.destroy(stale);
            }
        }
        self.grow_nested(id);
    }

    /// Overwrite the record of `id`, keeping the key index in sync.
    fn set_record(&mut self, id: NodeId, record: R) {
        let old_key = self.key_of(id);
        if let Some(node) = self.arena.get_node_mut(id) {
            node.contents = NodeContents::Record(record);
        }
        let new_key = self.key_of(id);
        if self.is_adjacency() && old_key != new_key {
            if let Some(key) = &old_key {
                self.unindex_key(key, id);
            }
            self.index_key(id);
        }
    }

    pub(crate) fn apply_move(&mut self, old_index: usize, new_index: usize, count: usize, plan: &mut Plan) {
        let moved: Vec<NodeId> = self.order.drain(old_index..old_index + count).collect();
        for (offset, &id) in moved.iter().enumerate() {
            self.order.insert(new_index + offset, id);
        }
        let mut touched: Vec<NodeId> = moved
            .iter()
            .filter_map(|&id| self.arena.get_node(id).and_then(|n| n.parent))
            .collect();
        plan.moved.extend(moved.iter().copied());
        let keys: Vec<Value> = moved.iter().filter_map(|&id| self.key_of(id)).collect();
        self.relink(&keys, plan, &mut touched);
        self.settle(&touched, &[], &plan.moved);
    }

    pub(crate) fn apply_change(&mut self, index: usize, field: &str, item: R, plan: &mut Plan) {
        let Some(&id) = self.order.get(index) else {
            return;
        };
        let parent = self.arena.get_node(id).and_then(|n| n.parent);
        if self.options.children_field() == Some(field) {
            self.regrow(id, item);
            plan.changed.push(id);
            let touched: Vec<NodeId> = parent.into_iter().collect();
            self.settle(&touched, &[id], &plan.moved);
            return;
        }

        let old_key = self.key_of(id);
        self.set_record(id, item);
        let new_key = self.key_of(id);

        let mut touched = Vec::new();
        let reparent = self.options.parent_key_field() == Some(field);
        let resolved = if reparent {
            Some(self.resolve_parent(id))
        } else {
            None
        };
        let mut keys = Vec::new();
        match resolved {
            Some(resolved) if parent != Some(resolved) => {
                self.arena.detach(id);
                self.arena.attach(id, resolved);
                plan.moved.push(id);
                plan.changed.extend(parent);
                plan.changed.push(resolved);
                touched.extend(parent);
                touched.push(resolved);
                keys.extend(self.subtree_keys(id));
            }
            _ => {
                plan.changed.push(id);
                plan.moved.push(id);
                touched.extend(parent);
            }
        }

        if old_key != new_key {
            keys.extend(old_key);
            keys.extend(new_key);
        }
        self.relink(&keys, plan, &mut touched);
        self.settle(&touched, &[], &plan.moved);
    }
}
