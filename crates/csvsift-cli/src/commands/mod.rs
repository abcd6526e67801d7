//! Subcommand implementations.

pub mod columns;
pub mod query;
pub mod search;
