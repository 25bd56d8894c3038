//! The projection engine: owns the node graph and turns source mutations
//! into projected change events.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, instrument, warn};

use crate::domain::arena::TreeArena;
use crate::domain::arrange::Arrangement;
use crate::domain::change::ProjectionChange;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node::{NodeContents, NodeId, TreeNode};
use crate::domain::options::{Linkage, ProjectionOptions};
use crate::domain::record::{FieldAccess, Value};
use crate::domain::source::SourceChange;
use crate::domain::translate::{self, Plan, Snapshot};
use crate::domain::uid::UidRegistry;

/// Callback receiving projected changes in emission order.
pub type Observer = Box<dyn FnMut(&ProjectionChange)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Live hierarchical projection over a flat source collection.
///
/// The projection keeps its own mirror of the source order (`order`), so each
/// [`SourceChange`] can be applied without access to the source itself.
pub struct TreeProjection<R> {
    pub(crate) options: ProjectionOptions<R>,
    pub(crate) root_key: Option<Value>,
    pub(crate) arena: TreeArena<R>,
    pub(crate) root: NodeId,
    /// Source index -> node of the top-level record
    pub(crate) order: Vec<NodeId>,
    /// Top-level record nodes by key (adjacency list only)
    pub(crate) keys: HashMap<Value, Vec<NodeId>>,
    pub(crate) uids: UidRegistry,
    pub(crate) rules: Arrangement<R>,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl<R> fmt::Debug for TreeProjection<R>
where
    R: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeProjection")
            .field("options", &self.options)
            .field("nodes", &self.arena.len())
            .field("records", &self.order.len())
            .field("rules", &self.rules)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl<R: FieldAccess> TreeProjection<R> {
    /// Build a projection over `records` (in source order).
    #[instrument(level = "debug", skip(options, records), fields(records = records.len()))]
    pub fn new(options: ProjectionOptions<R>, records: Vec<R>) -> DomainResult<Self> {
        options.validate()?;
        let root_key = options.root_key()?;
        let mut arena = TreeArena::new();
        let root = arena.insert_node(
            NodeContents::Root {
                key: None,
                record: None,
            },
            None,
        );
        let mut projection = Self {
            options,
            root_key,
            arena,
            root,
            order: Vec::new(),
            keys: HashMap::new(),
            uids: UidRegistry::new(),
            rules: Arrangement::default(),
            observers: Vec::new(),
            next_subscription: 0,
        };
        projection.rebuild(records);
        Ok(projection)
    }

    pub fn options(&self) -> &ProjectionOptions<R> {
        &self.options
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn arena(&self) -> &TreeArena<R> {
        &self.arena
    }

    /// Number of source records mirrored by the projection.
    pub fn record_count(&self) -> usize {
        self.order.len()
    }

    pub fn is_root_enumerable(&self) -> bool {
        self.options.root_enumerable
    }

    pub(crate) fn is_adjacency(&self) -> bool {
        matches!(self.options.linkage, Linkage::ParentKey(_))
    }

    pub fn node(&self, id: NodeId) -> DomainResult<&TreeNode<R>> {
        self.arena.get_node(id).ok_or(DomainError::UnknownNode(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.contains(id)
    }

    /// Visible record children of `id`, in enumeration order.
    pub fn children_of(&self, id: NodeId) -> DomainResult<Vec<NodeId>> {
        let node = self.node(id)?;
        Ok(node
            .layout
            .iter()
            .copied()
            .filter(|&c| self.arena.get_node(c).is_some_and(|n| n.is_record()))
            .collect())
    }

    pub fn parent_of(&self, id: NodeId) -> DomainResult<Option<NodeId>> {
        Ok(self.node(id)?.parent)
    }

    pub fn level_of(&self, id: NodeId) -> DomainResult<usize> {
        Ok(self.node(id)?.level)
    }

    pub fn uid_of(&self, id: NodeId) -> DomainResult<&str> {
        Ok(self.node(id)?.uid())
    }

    pub fn find_by_uid(&self, uid: &str) -> Option<NodeId> {
        self.uids.owner(uid)
    }

    /// All record nodes (nested ones included) whose key equals `key`.
    pub fn find_by_key(&self, key: &Value) -> Vec<NodeId> {
        self.arena
            .iter()
            .filter(|(_, node)| node.is_record() && node.key(&self.options.key_field).as_ref() == Some(key))
            .map(|(id, _)| id)
            .collect()
    }

    /// Node/leaf classification of `id`.
    pub fn is_node(&self, id: NodeId) -> DomainResult<bool> {
        let node = self.node(id)?;
        Ok(self.classify(node))
    }

    pub fn is_leaf(&self, id: NodeId) -> DomainResult<bool> {
        self.is_node(id).map(|is_node| !is_node)
    }

    pub(crate) fn classify(&self, node: &TreeNode<R>) -> bool {
        let has_visible_children = node
            .layout
            .iter()
            .any(|&c| self.arena.get_node(c).is_some_and(|n| n.is_record()));
        node.classify(self.options.node_field.as_deref(), has_visible_children)
    }

    pub fn is_expanded(&self, id: NodeId) -> DomainResult<bool> {
        Ok(self.node(id)?.expanded)
    }

    /// Set the presentation-only expanded flag. Emits nothing.
    pub fn set_expanded(&mut self, id: NodeId, expanded: bool) -> DomainResult<()> {
        let node = self.arena.get_node_mut(id).ok_or(DomainError::UnknownNode(id))?;
        node.expanded = expanded;
        Ok(())
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&ProjectionChange) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sid, _)| *sid != id);
        self.observers.len() != before
    }

    fn publish(&mut self, events: &[ProjectionChange]) {
        for event in events {
            for (_, observer) in self.observers.iter_mut() {
                observer(event);
            }
        }
    }

    /// Show or hide the root in the enumeration. Emits one add or remove
    /// for the root only.
    pub fn set_root_enumerable(&mut self, enumerable: bool) -> Vec<ProjectionChange> {
        self.reproject(|projection| projection.options.root_enumerable = enumerable)
    }

    /// Run `mutate` and publish the diff of the enumeration around it.
    pub(crate) fn reproject(&mut self, mutate: impl FnOnce(&mut Self)) -> Vec<ProjectionChange> {
        let before = self.snapshot();
        mutate(self);
        let after = self.snapshot();
        let events = translate::diff(&before, &after, &Plan::default());
        self.publish(&events);
        events
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        let mut snapshot = Snapshot::default();
        for (id, node) in self.enumerate() {
            snapshot.ids.push(id);
            snapshot.levels.push(node.level);
            snapshot.uids.push(node.uid.clone());
            snapshot.kinds.insert(id, self.classify(node));
        }
        snapshot
    }

    /// Source index -> position map used to keep siblings in source order.
    pub(crate) fn positions(&self) -> HashMap<NodeId, usize> {
        self.order
            .iter()
            .enumerate()
            .map(|(position, &id)| (id, position))
            .collect()
    }

    /// Apply one source mutation and emit the projected changes.
    ///
    /// The mutation is validated against the projection's mirror of the
    /// source before anything is touched; a mismatch is a contract violation.
    #[instrument(level = "debug", skip(self, change), fields(action = change.action()))]
    pub fn handle(&mut self, change: SourceChange<R>) -> DomainResult<Vec<ProjectionChange>> {
        self.check_contract(&change)?;
        let before = self.snapshot();
        let mut plan = Plan::default();

        let events = match change {
            SourceChange::Add { index, items } => {
                self.apply_add(index, items, &mut plan);
                translate::diff(&before, &self.snapshot(), &plan)
            }
            SourceChange::Remove { index, items } => {
                self.apply_remove(index, items.len(), &mut plan);
                translate::diff(&before, &self.snapshot(), &plan)
            }
            SourceChange::Replace {
                index, new_items, ..
            } => {
                self.apply_replace(index, new_items, &mut plan);
                translate::diff(&before, &self.snapshot(), &plan)
            }
            SourceChange::Move {
                old_index,
                new_index,
                items,
            } => {
                self.apply_move(old_index, new_index, items.len(), &mut plan);
                translate::diff(&before, &self.snapshot(), &plan)
            }
            SourceChange::Change { index, field, item } => {
                self.apply_change(index, &field, item, &mut plan);
                translate::diff(&before, &self.snapshot(), &plan)
            }
            SourceChange::Reset { items } => {
                let expanded: HashMap<String, bool> = self
                    .arena
                    .iter()
                    .map(|(_, node)| (node.uid.clone(), node.expanded))
                    .collect();
                self.rebuild(items);
                self.restore_expanded(&expanded);
                translate::diff_by_uid(&before, &self.snapshot())
            }
        };

        debug!(events = events.len(), "source change translated");
        self.publish(&events);
        Ok(events)
    }

    fn restore_expanded(&mut self, expanded: &HashMap<String, bool>) {
        let ids: Vec<NodeId> = self.arena.iter().map(|(id, _)| id).collect();
        for id in ids {
            if let Some(node) = self.arena.get_node_mut(id) {
                if let Some(&flag) = expanded.get(&node.uid) {
                    node.expanded = flag;
                }
            }
        }
    }

    fn check_contract(&self, change: &SourceChange<R>) -> DomainResult<()> {
        let len = self.order.len();
        let beyond = |index: usize, count: usize| index.checked_add(count).map_or(true, |end| end > len);
        let violation = match change {
            SourceChange::Add { index, .. } if *index > len => {
                Some(format!("add at {index} beyond source length {len}"))
            }
            SourceChange::Remove { index, items } if beyond(*index, items.len()) => Some(format!(
                "remove of {} item(s) at {index} beyond source length {len}",
                items.len()
            )),
            SourceChange::Remove { index, items } => self.mismatched_keys(*index, items),
            SourceChange::Replace {
                index,
                old_items,
                new_items,
            } => {
                if old_items.len() != new_items.len() {
                    Some(format!(
                        "replace of {} item(s) with {} item(s)",
                        old_items.len(),
                        new_items.len()
                    ))
                } else if beyond(*index, new_items.len()) {
                    Some(format!("replace at {index} beyond source length {len}"))
                } else {
                    self.mismatched_keys(*index, old_items)
                }
            }
            SourceChange::Move {
                old_index,
                new_index,
                items,
            } if beyond(*old_index, items.len()) || beyond(*new_index, items.len()) => Some(format!(
                "move {old_index} -> {new_index} of {} item(s) beyond source length {len}",
                items.len()
            )),
            SourceChange::Move {
                old_index, items, ..
            } => self.mismatched_keys(*old_index, items),
            SourceChange::Change { index, .. } if *index >= len => {
                Some(format!("change at {index} beyond source length {len}"))
            }
            SourceChange::Change { field, .. } if field.is_empty() => {
                Some("change without a field name".to_string())
            }
            // A key edit carries the new key; anything else must keep it.
            SourceChange::Change { index, field, item } if *field != self.options.key_field => {
                self.mismatched_keys(*index, std::slice::from_ref(item))
            }
            _ => None,
        };
        match violation {
            Some(message) => {
                warn!(%message, "rejecting source change");
                Err(DomainError::ContractViolation(message))
            }
            None => Ok(()),
        }
    }

    /// Keys of `items` must match the mirrored records starting at `index`.
    fn mismatched_keys(&self, index: usize, items: &[R]) -> Option<String> {
        let key_field = &self.options.key_field;
        items.iter().enumerate().find_map(|(offset, item)| {
            let mirrored = self
                .order
                .get(index + offset)
                .and_then(|&id| self.arena.get_node(id))
                .and_then(|node| node.key(key_field));
            let reported = item.field(key_field);
            (mirrored != reported).then(|| {
                format!(
                    "record at {} has key {:?}, notification says {:?}",
                    index + offset,
                    mirrored,
                    reported
                )
            })
        })
    }
}
