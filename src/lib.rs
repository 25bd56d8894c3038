//! Live hierarchical projection of flat record collections.
//!
//! A [`domain::TreeProjection`] turns records linked by parent keys (or
//! nested child lists) into a tree with a flat enumeration, and keeps it in
//! step with source mutations by emitting minimal index-based change events.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
