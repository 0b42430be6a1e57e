//! # Data Loader Crate
//!
//! Parses flat comma-separated recommendation files and locates the row for
//! a given article.
//!
//! ## Main Components
//!
//! - **types**: `Record` and `TabularData`, the header-keyed record set
//! - **parser**: text to records, and row lookup by `articleId`
//! - **error**: Error types, including the distinct "row not found" outcome
//!
//! ## Example Usage
//!
//! ```
//! use data_loader::extract_row;
//!
//! let csv = "articleId,title,score\n1,Foo,0.9\n2,Bar,0.5\n";
//! let row = extract_row(csv, "2").unwrap();
//! assert_eq!(row, vec!["Bar", "0.5"]);
//!
//! assert!(extract_row(csv, "9").unwrap_err().is_not_found());
//! ```

// Public modules
pub mod error;
pub mod types;
pub mod parser;

// Re-export commonly used types for convenience
pub use error::{Result, TabularError};
pub use parser::{extract_row, extract_row_by, load_table, parse_table};
pub use types::{KEY_COLUMN, Record, TabularData};
