//! Change translation: diff two enumerations into projected change events.
//!
//! Events are sequential. The translator replays them on a working copy of
//! the old enumeration (`cur`) and records each step against that copy, so
//! an observer applying the events in order ends with the new enumeration.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use tracing::trace;

use crate::domain::change::{ChangeAction, ProjectionChange};
use crate::domain::node::NodeId;

/// Enumeration state captured around one mutation.
#[derive(Debug, Clone, Default)]
pub(crate) struct Snapshot {
    pub(crate) ids: Vec<NodeId>,
    pub(crate) levels: Vec<usize>,
    pub(crate) uids: Vec<String>,
    /// Node/leaf classification of every enumerated node
    pub(crate) kinds: HashMap<NodeId, bool>,
}

/// What the builder knows about a mutation beyond the two enumerations.
#[derive(Debug, Clone, Default)]
pub(crate) struct Plan {
    /// Subtrees that may have changed position, in the order they moved
    pub(crate) moved: Vec<NodeId>,
    /// Nodes that get a change event whether or not they flipped
    pub(crate) changed: Vec<NodeId>,
    /// Ancestors whose node/leaf state may have flipped
    pub(crate) watch: Vec<NodeId>,
}

/// Emit removals, moves, additions and changes, in that order.
///
/// Surviving nodes whose level or uid changed without a move get a change
/// event ahead of the parents the builder reports.
pub(crate) fn diff(before: &Snapshot, after: &Snapshot, plan: &Plan) -> Vec<ProjectionChange> {
    let before_set: HashSet<NodeId> = before.ids.iter().copied().collect();
    let after_set: HashSet<NodeId> = after.ids.iter().copied().collect();
    let before_levels: HashMap<NodeId, usize> = before
        .ids
        .iter()
        .copied()
        .zip(before.levels.iter().copied())
        .collect();

    let mut events = Vec::new();
    let mut cur = before.ids.clone();
    remove_runs(&mut cur, |id| !after_set.contains(&id), &mut events);

    let target: Vec<NodeId> = after
        .ids
        .iter()
        .copied()
        .filter(|id| before_set.contains(id))
        .collect();
    for &root in plan.moved.iter().unique() {
        planned_move(&mut cur, &target, root, &before_levels, &mut events);
    }
    align(&mut cur, &target, &mut events);

    add_runs(&mut cur, &after.ids, |id| !before_set.contains(&id), &mut events);

    let after_index: HashMap<NodeId, usize> = after
        .ids
        .iter()
        .enumerate()
        .map(|(i, &id)| (id, i))
        .collect();
    let before_uids: HashMap<NodeId, &str> = before
        .ids
        .iter()
        .copied()
        .zip(before.uids.iter().map(String::as_str))
        .collect();
    let in_moves: HashSet<NodeId> = events
        .iter()
        .filter(|e| e.action == ChangeAction::Move)
        .flat_map(|e| e.new_items.iter().copied())
        .collect();
    // Nodes that stayed in place while their level or uid changed.
    let shifted = after
        .ids
        .iter()
        .copied()
        .zip(after.levels.iter().copied().zip(after.uids.iter()))
        .filter(|(id, (level, uid))| {
            before_levels
                .get(id)
                .is_some_and(|old| old != level || before_uids.get(id) != Some(&uid.as_str()))
        })
        .map(|(id, _)| id)
        .filter(|id| !in_moves.contains(id));
    let flipped = |id: &NodeId| match (before.kinds.get(id), after.kinds.get(id)) {
        (Some(old), Some(new)) => old != new,
        _ => false,
    };
    let planned = plan
        .changed
        .iter()
        .copied()
        .filter(|id| before_set.contains(id) && after_set.contains(id));
    let watched = plan.watch.iter().copied().filter(|id| flipped(id));
    let others = after.ids.iter().copied().filter(|id| flipped(id));
    for id in shifted.chain(planned).chain(watched).chain(others).unique() {
        if let Some(&index) = after_index.get(&id) {
            events.push(ProjectionChange::changed(index, id));
        }
    }
    trace!(events = events.len(), "enumeration diffed");
    events
}

/// Diff keyed by uid with adds and removes only.
///
/// Entries on the longest order-preserving run of shared uids are kept;
/// everything else is removed and added again.
pub(crate) fn diff_by_uid(before: &Snapshot, after: &Snapshot) -> Vec<ProjectionChange> {
    let after_positions: HashMap<&str, usize> = after
        .uids
        .iter()
        .enumerate()
        .map(|(i, uid)| (uid.as_str(), i))
        .collect();
    let shared: Vec<(usize, usize)> = before
        .uids
        .iter()
        .enumerate()
        .filter_map(|(i, uid)| after_positions.get(uid.as_str()).map(|&j| (i, j)))
        .collect();
    let kept = longest_increasing(&shared);
    let kept_before: HashSet<usize> = kept.iter().map(|&(i, _)| i).collect();
    let kept_after: HashSet<usize> = kept.iter().map(|&(_, j)| j).collect();

    let mut events = Vec::new();
    let mut cur: Vec<(usize, NodeId)> = before.ids.iter().copied().enumerate().collect();
    let mut i = 0;
    while i < cur.len() {
        if kept_before.contains(&cur[i].0) {
            i += 1;
            continue;
        }
        let end = (i..cur.len())
            .find(|&k| kept_before.contains(&cur[k].0))
            .unwrap_or(cur.len());
        let items = cur.drain(i..end).map(|(_, id)| id).collect();
        events.push(ProjectionChange::removed(i, items));
    }

    let mut j = 0;
    while j < after.ids.len() {
        if kept_after.contains(&j) {
            j += 1;
            continue;
        }
        let end = (j..after.ids.len())
            .find(|k| kept_after.contains(k))
            .unwrap_or(after.ids.len());
        events.push(ProjectionChange::added(j, after.ids[j..end].to_vec()));
        j = end;
    }
    events
}

/// Longest subsequence of `pairs` (ordered by first element) whose second
/// elements increase. Patience sorting with back links.
fn longest_increasing(pairs: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let mut tails: Vec<usize> = Vec::new();
    let mut links: Vec<Option<usize>> = vec![None; pairs.len()];
    for (k, &(_, value)) in pairs.iter().enumerate() {
        let slot = tails.partition_point(|&t| pairs[t].1 < value);
        links[k] = slot.checked_sub(1).map(|prev| tails[prev]);
        if slot == tails.len() {
            tails.push(k);
        } else {
            tails[slot] = k;
        }
    }
    let mut result = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(k) = cursor {
        result.push(pairs[k]);
        cursor = links[k];
    }
    result.reverse();
    result
}

fn remove_runs(
    cur: &mut Vec<NodeId>,
    gone: impl Fn(NodeId) -> bool,
    events: &mut Vec<ProjectionChange>,
) {
    let mut i = 0;
    while i < cur.len() {
        if !gone(cur[i]) {
            i += 1;
            continue;
        }
        let end = (i..cur.len()).find(|&k| !gone(cur[k])).unwrap_or(cur.len());
        let items: Vec<NodeId> = cur.drain(i..end).collect();
        events.push(ProjectionChange::removed(i, items));
    }
}

fn add_runs(
    cur: &mut Vec<NodeId>,
    after: &[NodeId],
    new: impl Fn(NodeId) -> bool,
    events: &mut Vec<ProjectionChange>,
) {
    let mut i = 0;
    while i < after.len() {
        if !new(after[i]) {
            i += 1;
            continue;
        }
        let end = (i..after.len()).find(|&k| !new(after[k])).unwrap_or(after.len());
        let items = after[i..end].to_vec();
        cur.splice(i..i, items.iter().copied());
        events.push(ProjectionChange::added(i, items));
        i = end;
    }
}

/// Move the subtree block headed by `root` to its target position, if the
/// target holds exactly that block.
fn planned_move(
    cur: &mut Vec<NodeId>,
    target: &[NodeId],
    root: NodeId,
    levels: &HashMap<NodeId, usize>,
    events: &mut Vec<ProjectionChange>,
) {
    let (Some(from), Some(to), Some(&level)) = (
        cur.iter().position(|&id| id == root),
        target.iter().position(|&id| id == root),
        levels.get(&root),
    ) else {
        return;
    };
    if from == to {
        return;
    }
    let len = 1 + cur[from + 1..]
        .iter()
        .take_while(|&id| levels.get(id).is_some_and(|&l| l > level))
        .count();
    if to + len > target.len() || target[to..to + len] != cur[from..from + len] {
        return;
    }
    let block: Vec<NodeId> = cur.drain(from..from + len).collect();
    cur.splice(to..to, block.iter().copied());
    events.push(ProjectionChange::moved(from, to, block));
}

/// Reorder `cur` into `target` by pulling misplaced blocks forward.
fn align(cur: &mut Vec<NodeId>, target: &[NodeId], events: &mut Vec<ProjectionChange>) {
    for i in 0..target.len() {
        if cur.get(i) == Some(&target[i]) {
            continue;
        }
        let Some(from) = cur.iter().skip(i).position(|&id| id == target[i]).map(|p| p + i) else {
            continue;
        };
        let mut len = 1;
        while i + len < target.len() && from + len < cur.len() && cur[from + len] == target[i + len] {
            len += 1;
        }
        let block: Vec<NodeId> = cur.drain(from..from + len).collect();
        cur.splice(i..i, block.iter().copied());
        events.push(ProjectionChange::moved(from, i, block));
    }
}
