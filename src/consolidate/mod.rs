// src/consolidate/mod.rs
pub mod columnar;
pub mod delimited;

use anyhow::Result;
use std::path::Path;
use tracing::info;

use crate::record::Record;

pub use delimited::{read_csv, write_csv};
pub use columnar::write_parquet;

/// Output column names, in order. The value column is revision-specific.
pub const KEY_COLUMN: &str = "year";
pub const CATEGORY_COLUMN: &str = "category";
pub const TYPE_COLUMN: &str = "type";
pub const NOTE_COLUMN: &str = "note";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Csv,
    Parquet,
}

/// The unioned long-format table.
///
/// Appending never merges: two stages emitting the same
/// (year, category, type) both end up in the output.
#[derive(Debug, Clone)]
pub struct Consolidated {
    value_column: String,
    records: Vec<Record>,
}

impl Consolidated {
    pub fn new(value_column: impl Into<String>) -> Self {
        Self {
            value_column: value_column.into(),
            records: Vec::new(),
        }
    }

    pub fn append(&mut self, stage: &str, records: impl IntoIterator<Item = Record>) {
        let before = self.records.len();
        self.records.extend(records);
        info!(stage, rows = self.records.len() - before, "appended");
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn value_column(&self) -> &str {
        &self.value_column
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn header(&self) -> [&str; 5] {
        [
            KEY_COLUMN,
            CATEGORY_COLUMN,
            TYPE_COLUMN,
            &self.value_column,
            NOTE_COLUMN,
        ]
    }

    /// Writes the table atomically; nothing is left at `path` on failure.
    pub fn write(&self, path: &Path, format: OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Csv => write_csv(self, path),
            OutputFormat::Parquet => write_parquet(self, path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Category, RecordType};

    #[test]
    fn append_keeps_duplicate_keys() {
        let mut table = Consolidated::new("value");
        let rec = Record::new(2017, Category::Gesamt, RecordType::Real, 3335.572);
        table.append("first", vec![rec.clone()]);
        table.append("second", vec![rec.clone().with_note("again")]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[0].year, table.records()[1].year);
    }

    #[test]
    fn header_uses_revision_value_column() {
        let table = Consolidated::new("co2");
        assert_eq!(table.header(), ["year", "category", "type", "co2", "note"]);
    }
}
