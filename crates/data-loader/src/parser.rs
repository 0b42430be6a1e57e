//! Parser for flat comma-separated recommendation files.
//!
//! Format:
//! - line 1: comma-separated header, e.g. `articleId,rec1,rec2`
//! - line 2..: comma-separated values, matched to the header by position
//!
//! There is no quoting: an embedded comma always starts a new cell.

use crate::error::{Result, TabularError};
use crate::types::{KEY_COLUMN, Record, TabularData};
use std::path::Path;
use tracing::debug;

/// Split raw text into lines after dropping trailing whitespace.
///
/// A `\r` left over from CRLF line endings is removed from each line.
fn split_lines(raw: &str) -> impl Iterator<Item = &str> {
    raw.trim_end()
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
}

/// Zip one data line with the header.
///
/// Missing trailing cells become empty strings; surplus cells are dropped.
fn parse_record(header: &[String], line: &str) -> Record {
    let mut cells = line.split(',');
    let mut record = Record::new();
    for column in header {
        record.insert(column, cells.next().unwrap_or_default());
    }
    record
}

/// Parse comma-separated text into a header-keyed record set
pub fn parse_table(raw: &str) -> TabularData {
    let mut lines = split_lines(raw);

    // `split` always yields at least one item, so an empty body has a
    // single unnamed column and no records.
    let header: Vec<String> = lines
        .next()
        .unwrap_or_default()
        .split(',')
        .map(str::to_string)
        .collect();

    let records = lines.map(|line| parse_record(&header, line)).collect();

    TabularData { header, records }
}

/// Locate the row whose `articleId` equals `lookup_key` and return its
/// values without the first column.
///
/// Example:
/// ```text
/// articleId,title,score
/// 1,Foo,0.9
/// 2,Bar,0.5
/// ```
/// `extract_row(text, "2")` -> `["Bar", "0.5"]`
pub fn extract_row(raw: &str, lookup_key: &str) -> Result<Vec<String>> {
    extract_row_by(raw, KEY_COLUMN, lookup_key)
}

/// Same as [`extract_row`] with an explicit key column
pub fn extract_row_by(raw: &str, column: &str, lookup_key: &str) -> Result<Vec<String>> {
    let table = parse_table(raw);
    debug!(
        "Parsed table with {} columns and {} records",
        table.header.len(),
        table.len()
    );

    let record = table
        .find_by(column, lookup_key)
        .cloned()
        .ok_or_else(|| TabularError::RowNotFound {
            column: column.to_string(),
            key: lookup_key.to_string(),
        })?;

    Ok(record.into_values_without_key())
}

/// Read and parse a local comma-separated file
pub fn load_table(path: &Path) -> Result<TabularData> {
    let raw = std::fs::read_to_string(path).map_err(|source| TabularError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(parse_table(&raw))
}
