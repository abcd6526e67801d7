//! # csvsift Core Library
//!
//! This crate provides the query model, evaluation, and archive scanning for
//! csvsift, a tool that searches CSV files packed inside ZIP archives with a
//! boolean query built from a flat, indented list of criteria.
//!
//! ## Architecture
//!
//! - **Criteria** (`criteria`, `query`): Criterion model and query-list editing
//! - **Compare** (`compare`): Per-cell tests for each search type
//! - **Expressions** (`expr`): Turns the indented list into a tree and evaluates rows
//! - **Scanner** (`scanner`): Streams CSV entries out of archives
//! - **Engine** (`engine`): Runs scans in the background with progress and cancellation
//! - **Export** (`export`): CSV output of result rows
//! - **Discovery** (`discover`): Header columns of the first archive
//! - **Config** (`config`): Configuration management
//!
//! ## Example
//!
//! ```rust
//! use csvsift_core::{Criterion, Expression, LogicalOperator, SearchType};
//! use std::collections::HashMap;
//!
//! // Age > 18 AND (City = oslo OR City = bergen)
//! let criteria = vec![
//!     Criterion::new("Age", SearchType::GreaterThan, "18"),
//!     Criterion::new("City", SearchType::ExactMatch, "oslo").indented(1),
//!     Criterion::new("City", SearchType::ExactMatch, "bergen")
//!         .joined_by(LogicalOperator::Or)
//!         .indented(1),
//! ];
//! let expression = Expression::compile(&criteria).unwrap();
//!
//! let mut row = HashMap::new();
//! row.insert("Age".to_string(), "30".to_string());
//! row.insert("City".to_string(), "Bergen".to_string());
//! assert!(expression.evaluate(&row));
//! ```

pub mod compare;
pub mod config;
pub mod criteria;
pub mod discover;
pub mod engine;
pub mod error;
pub mod export;
pub mod expr;
pub mod progress;
pub mod query;
pub mod scanner;
pub mod types;

#[cfg(test)]
mod testutil;

// Re-export commonly used types
pub use compare::Comparator;
pub use config::{Config, ExportConfig, GeneralConfig, ScanConfig};
pub use criteria::{Criterion, LogicalOperator, SearchType};
pub use discover::discover_columns;
pub use engine::{
    run_scan, ScanEngine, ScanHandle, ScanOutcome, ScanReport, ScanRequest, ScanState, ScanStatus,
};
pub use error::{Result, SiftError};
pub use expr::{ColumnLookup, Expression};
pub use progress::{
    CancelToken, ChannelProgress, LoggingProgress, NullProgress, ProgressSink, ScanEvent,
};
pub use query::Query;
pub use scanner::{ArchiveScanner, ArchiveStats};
pub use types::{ResultRow, RowKind};
