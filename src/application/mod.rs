//! Application layer: services and use cases
//!
//! This layer keeps a source collection and its projection in step and
//! replays declarative mutation scripts.

pub mod error;
pub mod script;
pub mod services;

pub use error::{ApplicationError, ApplicationResult};
pub use script::{Script, Step};
pub use services::LiveTree;
