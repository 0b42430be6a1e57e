//! Error types for the orchestrator crate.
//!
//! Neither type escapes a fetch: `DispatchError` is converted into the
//! source's recommendation entry, and `SubmitError` is returned before any
//! fetch starts.

use data_loader::TabularError;
use fetch_client::FetchError;
use sources::SourceError;
use thiserror::Error;

/// Shown when a fetch fails for any reason other than a missing row
pub const FETCH_ERROR_MESSAGE: &str = "Error fetching data";

/// Shown when a tabular source answered but had no row for the lookup key
pub const NOT_FOUND_MESSAGE: &str = "No recommendations found";

/// Why a single source fetch did not produce data
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Descriptor(#[from] SourceError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Invalid JSON payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Tabular(#[from] TabularError),
}

impl DispatchError {
    /// The lookup ran to completion and matched nothing
    pub fn is_not_found(&self) -> bool {
        matches!(self, DispatchError::Tabular(e) if e.is_not_found())
    }

    /// Message stored in the source's recommendation entry
    pub fn user_message(&self) -> &'static str {
        if self.is_not_found() {
            NOT_FOUND_MESSAGE
        } else {
            FETCH_ERROR_MESSAGE
        }
    }
}

/// Reasons a submission is refused before any fetch is issued
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("Please enter both user ID and article ID")]
    MissingIdentifiers,

    #[error("Recommendations are still loading")]
    Busy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_keeps_its_own_message() {
        let err = DispatchError::from(TabularError::RowNotFound {
            column: "articleId".to_string(),
            key: "9".to_string(),
        });
        assert!(err.is_not_found());
        assert_eq!(err.user_message(), NOT_FOUND_MESSAGE);
    }

    #[test]
    fn test_everything_else_is_a_fetch_error() {
        let status = DispatchError::from(FetchError::Status {
            url: "http://localhost/x.csv".to_string(),
            status: 500,
        });
        assert_eq!(status.user_message(), FETCH_ERROR_MESSAGE);

        let decode = DispatchError::from(serde_json::from_str::<Vec<String>>("{").unwrap_err());
        assert_eq!(decode.user_message(), FETCH_ERROR_MESSAGE);

        let io = DispatchError::from(TabularError::Io {
            path: "x.csv".to_string(),
            source: std::io::Error::other("boom"),
        });
        assert!(!io.is_not_found());
        assert_eq!(io.user_message(), FETCH_ERROR_MESSAGE);
    }
}
