//! Live tree service
//!
//! Wires one source collection to one projection: every source mutation is
//! handed to the projection and the projected events are returned.

use tracing::{debug, instrument};

use crate::application::ApplicationResult;
use crate::domain::{
    Comparator, FieldAccess, FilterFn, GroupKeyFn, NodeId, ProjectionChange, ProjectionOptions,
    SourceChange, SourceList, SubscriptionId, TreeProjection, Value,
};

/// A source list kept in sync with its tree projection.
#[derive(Debug)]
pub struct LiveTree<R> {
    source: SourceList<R>,
    projection: TreeProjection<R>,
}

impl<R: FieldAccess> LiveTree<R> {
    pub fn new(options: ProjectionOptions<R>, records: Vec<R>) -> ApplicationResult<Self> {
        let projection = TreeProjection::new(options, records.clone())?;
        Ok(Self {
            source: SourceList::new(records),
            projection,
        })
    }

    pub fn source(&self) -> &SourceList<R> {
        &self.source
    }

    pub fn projection(&self) -> &TreeProjection<R> {
        &self.projection
    }

    pub fn subscribe(
        &mut self,
        observer: impl FnMut(&ProjectionChange) + 'static,
    ) -> SubscriptionId {
        self.projection.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.projection.unsubscribe(id)
    }

    fn forward(&mut self, change: Option<SourceChange<R>>) -> ApplicationResult<Vec<ProjectionChange>> {
        match change {
            Some(change) => Ok(self.projection.handle(change)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn insert(&mut self, index: usize, record: R) -> ApplicationResult<Vec<ProjectionChange>> {
        let change = self.source.insert(index, record)?;
        self.forward(change)
    }

    pub fn push(&mut self, record: R) -> ApplicationResult<Vec<ProjectionChange>> {
        let change = self.source.push(record);
        self.forward(change)
    }

    pub fn remove(&mut self, index: usize) -> ApplicationResult<Vec<ProjectionChange>> {
        let change = self.source.remove(index)?;
        self.forward(change)
    }

    pub fn replace(&mut self, index: usize, record: R) -> ApplicationResult<Vec<ProjectionChange>> {
        let change = self.source.replace(index, record)?;
        self.forward(change)
    }

    pub fn move_item(&mut self, from: usize, to: usize) -> ApplicationResult<Vec<ProjectionChange>> {
        let change = self.source.move_item(from, to)?;
        self.forward(change)
    }

    pub fn set_field(
        &mut self,
        index: usize,
        field: &str,
        value: Value,
    ) -> ApplicationResult<Vec<ProjectionChange>> {
        let change = self.source.set_field(index, field, value)?;
        self.forward(change)
    }

    pub fn reset(&mut self, records: Vec<R>) -> ApplicationResult<Vec<ProjectionChange>> {
        let change = self.source.reset(records);
        self.forward(change)
    }

    /// Enter batch mode: mutations apply to the source only.
    pub fn suspend(&mut self) {
        self.source.suspend();
    }

    /// Leave batch mode; the projection catches up with a single reset.
    #[instrument(level = "debug", skip(self))]
    pub fn resume(&mut self) -> ApplicationResult<Vec<ProjectionChange>> {
        let change = self.source.resume();
        let events = self.forward(change)?;
        debug!(events = events.len(), "batch applied");
        Ok(events)
    }

    pub fn set_sort(&mut self, sort: Option<Comparator<R>>) -> Vec<ProjectionChange> {
        self.projection.set_sort(sort)
    }

    pub fn set_group(&mut self, group: Option<GroupKeyFn<R>>) -> Vec<ProjectionChange> {
        self.projection.set_group(group)
    }

    pub fn set_filter(&mut self, filter: Option<FilterFn<R>>) -> Vec<ProjectionChange> {
        self.projection.set_filter(filter)
    }

    pub fn set_root_enumerable(&mut self, enumerable: bool) -> Vec<ProjectionChange> {
        self.projection.set_root_enumerable(enumerable)
    }

    pub fn set_expanded(&mut self, id: NodeId, expanded: bool) -> ApplicationResult<()> {
        Ok(self.projection.set_expanded(id, expanded)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChangeAction, Record};

    fn rec(id: i64, pid: i64) -> Record {
        Record::new().with("id", id).with("pid", pid)
    }

    fn tree() -> LiveTree<Record> {
        LiveTree::new(
            ProjectionOptions::adjacency("id", "pid").with_root_key(0),
            vec![rec(1, 0), rec(2, 0)],
        )
        .expect("build")
    }

    #[test]
    fn given_suspended_tree_when_mutating_then_events_wait_for_resume() {
        let mut tree = tree();
        tree.suspend();
        assert!(tree.push(rec(3, 1)).expect("push").is_empty());
        assert!(tree.remove(1).expect("remove").is_empty());
        assert_eq!(tree.projection().len(), 2);

        let events = tree.resume().expect("resume");

        assert!(events
            .iter()
            .all(|e| matches!(e.action, ChangeAction::Add | ChangeAction::Remove)));
        assert_eq!(tree.projection().len(), 2);
        assert_eq!(tree.projection().record_count(), 2);
    }

    #[test]
    fn given_out_of_range_index_when_removing_then_source_error_is_returned() {
        let mut tree = tree();
        assert!(tree.remove(5).is_err());
        assert_eq!(tree.source().len(), 2);
    }
}
