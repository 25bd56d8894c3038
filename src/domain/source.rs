//! Source collection and its mutation-notification protocol.

use tracing::{debug, instrument};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::record::{FieldAccess, Value};

/// One raw mutation of the source collection.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceChange<R> {
    /// `items` were inserted starting at `index`.
    Add { index: usize, items: Vec<R> },
    /// `items` were removed starting at `index`.
    Remove { index: usize, items: Vec<R> },
    /// Records at `index..` were swapped for new instances.
    Replace {
        index: usize,
        old_items: Vec<R>,
        new_items: Vec<R>,
    },
    /// `items` moved from `old_index` to `new_index` (indices of the first item,
    /// `new_index` counted after removal).
    Move {
        old_index: usize,
        new_index: usize,
        items: Vec<R>,
    },
    /// One field of the record at `index` was edited in place; `item` is the
    /// record after the edit.
    Change { index: usize, field: String, item: R },
    /// Bulk reload; `items` is the complete new contents.
    Reset { items: Vec<R> },
}

impl<R> SourceChange<R> {
    pub fn action(&self) -> &'static str {
        match self {
            SourceChange::Add { .. } => "add",
            SourceChange::Remove { .. } => "remove",
            SourceChange::Replace { .. } => "replace",
            SourceChange::Move { .. } => "move",
            SourceChange::Change { .. } => "change",
            SourceChange::Reset { .. } => "reset",
        }
    }
}

/// Ordered, observable record collection.
///
/// Every mutator returns the notification describing it, or `None` while
/// notifications are suspended. `resume` folds everything that happened
/// while suspended into one `Reset`.
#[derive(Debug, Clone, Default)]
pub struct SourceList<R> {
    items: Vec<R>,
    suspended: bool,
}

impl<R: FieldAccess> SourceList<R> {
    pub fn new(items: Vec<R>) -> Self {
        Self {
            items,
            suspended: false,
        }
    }

    pub fn items(&self) -> &[R] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&R> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    fn emit(&self, change: SourceChange<R>) -> Option<SourceChange<R>> {
        if self.suspended {
            None
        } else {
            Some(change)
        }
    }

    fn check_index(&self, index: usize, inclusive: bool) -> DomainResult<()> {
        let len = self.items.len();
        if index > len || (!inclusive && index == len) {
            return Err(DomainError::InvalidArgument(format!(
                "source index {index} out of range (len {len})"
            )));
        }
        Ok(())
    }

    #[instrument(level = "trace", skip(self, item))]
    pub fn insert(&mut self, index: usize, item: R) -> DomainResult<Option<SourceChange<R>>> {
        self.check_index(index, true)?;
        self.items.insert(index, item.clone());
        Ok(self.emit(SourceChange::Add {
            index,
            items: vec![item],
        }))
    }

    pub fn push(&mut self, item: R) -> Option<SourceChange<R>> {
        let index = self.items.len();
        self.items.push(item.clone());
        self.emit(SourceChange::Add {
            index,
            items: vec![item],
        })
    }

    #[instrument(level = "trace", skip(self))]
    pub fn remove(&mut self, index: usize) -> DomainResult<Option<SourceChange<R>>> {
        self.check_index(index, false)?;
        let item = self.items.remove(index);
        Ok(self.emit(SourceChange::Remove {
            index,
            items: vec![item],
        }))
    }

    #[instrument(level = "trace", skip(self, item))]
    pub fn replace(&mut self, index: usize, item: R) -> DomainResult<Option<SourceChange<R>>> {
        self.check_index(index, false)?;
        let old = std::mem::replace(&mut self.items[index], item.clone());
        Ok(self.emit(SourceChange::Replace {
            index,
            old_items: vec![old],
            new_items: vec![item],
        }))
    }

    /// Move the item at `from` so that it ends up at `to`.
    #[instrument(level = "trace", skip(self))]
    pub fn move_item(&mut self, from: usize, to: usize) -> DomainResult<Option<SourceChange<R>>> {
        self.check_index(from, false)?;
        self.check_index(to, false)?;
        let item = self.items.remove(from);
        self.items.insert(to, item.clone());
        Ok(self.emit(SourceChange::Move {
            old_index: from,
            new_index: to,
            items: vec![item],
        }))
    }

    /// Edit one field of the record at `index` in place.
    #[instrument(level = "trace", skip(self, value))]
    pub fn set_field(
        &mut self,
        index: usize,
        field: &str,
        value: Value,
    ) -> DomainResult<Option<SourceChange<R>>> {
        self.check_index(index, false)?;
        let item = &mut self.items[index];
        item.set_field(field, value);
        let item = item.clone();
        Ok(self.emit(SourceChange::Change {
            index,
            field: field.to_string(),
            item,
        }))
    }

    /// Replace the whole contents.
    pub fn reset(&mut self, items: Vec<R>) -> Option<SourceChange<R>> {
        self.items = items;
        self.emit(SourceChange::Reset {
            items: self.items.clone(),
        })
    }

    /// Stop emitting notifications until [`resume`](Self::resume).
    pub fn suspend(&mut self) {
        debug!("source notifications suspended");
        self.suspended = true;
    }

    /// Re-enable notifications. Returns a `Reset` if notifications were
    /// suspended, since the suppressed history is not replayed.
    pub fn resume(&mut self) -> Option<SourceChange<R>> {
        if !self.suspended {
            return None;
        }
        self.suspended = false;
        debug!(len = self.items.len(), "source notifications resumed");
        Some(SourceChange::Reset {
            items: self.items.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::Record;

    fn rec(id: i64) -> Record {
        Record::new().with("id", id)
    }

    #[test]
    fn given_list_when_mutating_then_emits_matching_notifications() {
        let mut list = SourceList::new(vec![rec(1), rec(2)]);

        let change = list.insert(1, rec(3)).expect("insert");
        assert_eq!(
            change,
            Some(SourceChange::Add {
                index: 1,
                items: vec![rec(3)]
            })
        );

        let change = list.move_item(0, 2).expect("move");
        assert_eq!(
            change,
            Some(SourceChange::Move {
                old_index: 0,
                new_index: 2,
                items: vec![rec(1)]
            })
        );
        let ids: Vec<_> = list.items().iter().map(|r| r.field("id")).collect();
        assert_eq!(ids, vec![Some(Value::Int(3)), Some(Value::Int(2)), Some(Value::Int(1))]);
    }

    #[test]
    fn given_suspended_list_when_resumed_then_emits_single_reset() {
        let mut list = SourceList::new(vec![rec(1)]);
        list.suspend();
        assert_eq!(list.push(rec(2)), None);
        assert_eq!(list.remove(0).expect("remove"), None);

        let change = list.resume();
        assert_eq!(change, Some(SourceChange::Reset { items: vec![rec(2)] }));
        assert_eq!(list.resume(), None);
    }

    #[test]
    fn given_out_of_range_index_when_removing_then_errors() {
        let mut list: SourceList<Record> = SourceList::new(vec![]);
        assert!(matches!(list.remove(0), Err(DomainError::InvalidArgument(_))));
    }
}
