//! Path-based node uids with numeric suffixes for duplicates.

use std::collections::HashMap;

use crate::domain::arena::TreeArena;
use crate::domain::node::{NodeContents, NodeId};
use crate::domain::record::FieldAccess;

/// Uid of a root without a key.
pub const ANONYMOUS_ROOT_UID: &str = "root";

/// Tracks which uids are taken and by whom.
#[derive(Debug, Default)]
pub struct UidRegistry {
    taken: HashMap<String, NodeId>,
}

impl UidRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `base`, or the first free `base-N`.
    pub fn acquire(&mut self, base: &str, owner: NodeId) -> String {
        if !self.taken.contains_key(base) {
            self.taken.insert(base.to_string(), owner);
            return base.to_string();
        }
        let mut suffix = 1usize;
        loop {
            let candidate = format!("{base}-{suffix}");
            if !self.taken.contains_key(&candidate) {
                self.taken.insert(candidate.clone(), owner);
                return candidate;
            }
            suffix += 1;
        }
    }

    /// Free a uid, but only if `owner` still holds it.
    pub fn release(&mut self, uid: &str, owner: NodeId) {
        if self.taken.get(uid) == Some(&owner) {
            self.taken.remove(uid);
        }
    }

    pub fn owner(&self, uid: &str) -> Option<NodeId> {
        self.taken.get(uid).copied()
    }

    pub fn len(&self) -> usize {
        self.taken.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taken.is_empty()
    }

    pub fn clear(&mut self) {
        self.taken.clear();
    }
}

/// Colon-joined key chain from `id` up to, but excluding, the root.
pub(crate) fn key_chain<R: FieldAccess>(arena: &TreeArena<R>, key_field: &str, id: NodeId) -> String {
    let mut segments = Vec::new();
    let mut cursor = Some(id);
    while let Some(current) = cursor {
        let Some(node) = arena.get_node(current) else {
            break;
        };
        match &node.contents {
            NodeContents::Root { key, .. } => {
                if segments.is_empty() {
                    segments.push(
                        key.as_ref()
                            .map(ToString::to_string)
                            .unwrap_or_else(|| ANONYMOUS_ROOT_UID.to_string()),
                    );
                }
                break;
            }
            NodeContents::Record(record) => segments.push(
                record
                    .field(key_field)
                    .map(|k| k.to_string())
                    .unwrap_or_else(|| format!("#{}", current.0.into_raw_parts().0)),
            ),
            NodeContents::Group(key) => segments.push(format!("#{key}")),
        }
        cursor = node.parent;
    }
    segments.join(":")
}

#[cfg(test)]
mod tests {
    use super::*;
    use generational_arena::Index;

    fn owner(n: usize) -> NodeId {
        NodeId(Index::from_raw_parts(n, 0))
    }

    #[test]
    fn given_taken_base_when_acquiring_then_appends_first_free_suffix() {
        let mut uids = UidRegistry::new();
        assert_eq!(uids.acquire("2:1", owner(1)), "2:1");
        assert_eq!(uids.acquire("2:1", owner(2)), "2:1-1");
        assert_eq!(uids.acquire("2:1", owner(3)), "2:1-2");

        uids.release("2:1-1", owner(2));
        assert_eq!(uids.acquire("2:1", owner(4)), "2:1-1");
        assert_eq!(uids.len(), 3);
    }

    #[test]
    fn given_foreign_owner_when_releasing_then_keeps_uid() {
        let mut uids = UidRegistry::new();
        uids.acquire("3", owner(1));
        uids.release("3", owner(9));
        assert_eq!(uids.owner("3"), Some(owner(1)));
    }
}
