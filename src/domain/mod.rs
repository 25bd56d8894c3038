//! Domain layer: the tree projection engine.
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod arrange;
pub mod builder;
pub mod change;
pub mod enumerate;
pub mod error;
pub mod index;
pub mod node;
pub mod options;
pub mod projection;
pub mod record;
pub mod source;
pub(crate) mod translate;
pub mod uid;

pub use arena::TreeArena;
pub use arrange::{
    filter_by_field, group_by_field, sort_by_field, Arrangement, Comparator, FilterFn, GroupKeyFn,
    SortEntry,
};
pub use change::{ChangeAction, ProjectionChange};
pub use enumerate::{Enumeration, TreeCursor};
pub use error::{DomainError, DomainResult};
pub use node::{NodeContents, NodeId, TreeNode};
pub use options::{Linkage, ProjectionOptions, RootSpec};
pub use projection::{Observer, SubscriptionId, TreeProjection};
pub use record::{Field, FieldAccess, Record, Value};
pub use source::{SourceChange, SourceList};
pub use uid::{UidRegistry, ANONYMOUS_ROOT_UID};
