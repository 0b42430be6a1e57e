//! Core types for header-keyed comma-separated data.
//!
//! A `TabularData` is the parsed form of a flat CSV body: an ordered header
//! and one `Record` per subsequent line. Records keep their columns in header
//! order so that "every value except the key column" is well defined.

/// Column that tabular recommendation files are keyed by
pub const KEY_COLUMN: &str = "articleId";

/// One row of a table, keyed by column name.
///
/// Columns appear in header order. A header name that repeats keeps the
/// position of its first occurrence and the value of its last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Set `column` to `value`, appending the column if it is new
    pub fn insert(&mut self, column: &str, value: impl Into<String>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| name == column) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((column.to_string(), value)),
        }
    }

    /// Value of `column`, if the record has it
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Column names in order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Cell values in column order
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(_, value)| value.as_str())
    }

    /// All values except the first column, which by convention is the key.
    pub fn into_values_without_key(self) -> Vec<String> {
        self.fields.into_iter().skip(1).map(|(_, value)| value).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A parsed table: the header line plus every data line as a `Record`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabularData {
    pub header: Vec<String>,
    pub records: Vec<Record>,
}

impl TabularData {
    /// First record (in file order) whose `column` equals `key`.
    ///
    /// Duplicates are not resolved: the earliest match wins.
    pub fn find_by(&self, column: &str, key: &str) -> Option<&Record> {
        self.records
            .iter()
            .find(|record| record.get(column) == Some(key))
    }

    /// Number of data records (the header is not counted)
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
