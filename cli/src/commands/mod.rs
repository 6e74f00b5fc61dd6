//! CLI command implementations.

pub mod backup;
pub mod inspect;
pub mod prune;
