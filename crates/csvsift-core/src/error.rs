//! Error types for csvsift core operations.
//!
//! This module defines well-structured error types using `thiserror` for
//! library-level errors, while the CLI uses `anyhow` for convenient error
//! handling at the command layer.
//!
//! Errors fall into the tiers the scanner cares about: run-level failures
//! stop a scan, per-archive failures only skip the offending archive.
//! Parse-level problems (bad regex, non-numeric cells) never become errors.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using SiftError
pub type Result<T> = std::result::Result<T, SiftError>;

/// Core error types for csvsift operations.
#[derive(Error, Debug)]
pub enum SiftError {
    // === Run-level Errors ===
    /// The target folder does not exist or is not a directory
    #[error("folder not found: {}", path.display())]
    FolderNotFound { path: PathBuf },

    /// Walking the target folder failed
    #[error("failed to enumerate {}: {reason}", path.display())]
    Enumeration { path: PathBuf, reason: String },

    // === Per-archive Errors ===
    /// An archive could not be opened or one of its entries could not be read
    #[error("{archive}: {reason}")]
    Archive { archive: String, reason: String },

    // === Column Discovery ===
    /// No archive was found under the folder
    #[error("no archives found in {}", folder.display())]
    NoArchives { folder: PathBuf },

    /// The archive holds no CSV entries
    #[error("no CSV files found in {archive}")]
    NoCsvEntries { archive: String },

    /// The CSV entry has no header line
    #[error("{entry} in {archive} appears to be empty")]
    EmptyEntry { archive: String, entry: String },

    // === Query Errors ===
    /// The indentation of the criteria list does not describe a valid tree
    #[error("malformed expression at criterion {position}: {reason}")]
    MalformedExpression { position: usize, reason: String },

    /// A query-list edit would break the indentation rules
    #[error("invalid edit: {reason}")]
    InvalidEdit { reason: String },

    /// A query file could not be read or written
    #[error("query file {}: {reason}", path.display())]
    QueryFile { path: PathBuf, reason: String },

    // === Export Errors ===
    /// Results could not be written
    #[error("export to {} failed: {reason}", path.display())]
    Export { path: PathBuf, reason: String },

    // === Engine Errors ===
    /// A scan is already running on this engine
    #[error("a scan is already in progress")]
    ScanInProgress,

    // === Configuration Errors ===
    /// Configuration file parsing failed
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    // === I/O Errors ===
    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// Serialization/deserialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    // === Internal Errors ===
    /// Internal error that should not happen
    #[error("internal error: {0}")]
    Internal(String),
}

impl SiftError {
    /// Returns true if this error aborts a whole scan run
    pub fn is_run_level(&self) -> bool {
        matches!(
            self,
            SiftError::FolderNotFound { .. }
                | SiftError::Enumeration { .. }
                | SiftError::Internal(_)
        )
    }

    /// Returns true if this error only affects a single archive
    pub fn is_per_archive(&self) -> bool {
        matches!(self, SiftError::Archive { .. })
    }

    /// Create an archive error naming the archive
    pub fn archive(archive: impl Into<String>, reason: impl ToString) -> Self {
        SiftError::Archive {
            archive: archive.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for SiftError {
    fn from(err: serde_json::Error) -> Self {
        SiftError::Serialization(err.to_string())
    }
}
