//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.

mod live_tree;

pub use live_tree::LiveTree;
