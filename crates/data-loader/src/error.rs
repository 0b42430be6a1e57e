//! Error types for the data-loader crate.
//!
//! `RowNotFound` is not a failure of the parser: it is the "no matching
//! record" answer of a lookup, and callers must keep it distinguishable from
//! I/O problems.

use thiserror::Error;

/// Errors that can occur while loading or querying comma-separated data
#[derive(Error, Debug)]
pub enum TabularError {
    /// I/O error occurred while reading a local file
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// No record matched the lookup key
    #[error("No row with {column} = {key}")]
    RowNotFound { column: String, key: String },
}

impl TabularError {
    /// True when the lookup completed but nothing matched.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TabularError::RowNotFound { .. })
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, TabularError>;
