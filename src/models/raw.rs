use crate::models::Column;

/// A data row as read from disk, before any parsing or cleaning.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// 1-based line number in the source file (header is line 1)
    pub line: u64,
    pub timestamp: String,
    /// Cell text aligned with `RawDataset::columns`; `None` when the row was short
    pub values: Vec<Option<String>>,
    pub cleaning: Option<String>,
}

/// Loader output for one country.
#[derive(Debug, Clone)]
pub struct RawDataset {
    pub country: String,
    /// Human-readable origin, e.g. a path or `archive.zip:benin.csv`
    pub source: String,
    pub columns: Vec<Column>,
    pub rows: Vec<RawRecord>,
    /// Rows the CSV layer could not read at all
    pub malformed_rows: usize,
}

impl RawDataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
