//! Declarative mutation scripts, replayed against a [`LiveTree`].

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::application::services::LiveTree;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{ProjectionChange, Record, Value};

/// One source mutation, tagged by `op` in TOML:
///
/// ```toml
/// [[steps]]
/// op = "set"
/// index = 2
/// field = "pid"
/// value = 1
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Insert { index: usize, record: Record },
    Push { record: Record },
    Remove { index: usize },
    Replace { index: usize, record: Record },
    Move { from: usize, to: usize },
    Set { index: usize, field: String, value: Value },
    Reset { records: Vec<Record> },
    Suspend,
    Resume,
    Root { enumerable: bool },
}

impl Step {
    pub fn apply(&self, tree: &mut LiveTree<Record>) -> ApplicationResult<Vec<ProjectionChange>> {
        match self {
            Step::Insert { index, record } => tree.insert(*index, record.clone()),
            Step::Push { record } => tree.push(record.clone()),
            Step::Remove { index } => tree.remove(*index),
            Step::Replace { index, record } => tree.replace(*index, record.clone()),
            Step::Move { from, to } => tree.move_item(*from, *to),
            Step::Set {
                index,
                field,
                value,
            } => tree.set_field(*index, field, value.clone()),
            Step::Reset { records } => tree.reset(records.clone()),
            Step::Suspend => {
                tree.suspend();
                Ok(Vec::new())
            }
            Step::Resume => tree.resume(),
            Step::Root { enumerable } => Ok(tree.set_root_enumerable(*enumerable)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Script {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// Apply every step in order, reporting each step's events and the tree
    /// as left by the step to `on_step`. Stops at the first failing step;
    /// steps are numbered from 1.
    #[instrument(level = "debug", skip_all, fields(steps = self.steps.len()))]
    pub fn replay(
        &self,
        tree: &mut LiveTree<Record>,
        mut on_step: impl FnMut(usize, &Step, &[ProjectionChange], &LiveTree<Record>),
    ) -> ApplicationResult<usize> {
        let mut total = 0;
        for (i, step) in self.steps.iter().enumerate() {
            let number = i + 1;
            let events = step
                .apply(tree)
                .map_err(|e| ApplicationError::at_step(number, e))?;
            debug!(step = number, events = events.len(), "step applied");
            total += events.len();
            on_step(number, step, &events, tree);
        }
        Ok(total)
    }
}
