//! CSV Seeding
//!
//! Loads `label,object_key` rows into label-association records, mainly to
//! fill the SQLite backend for local development.
//!
//! ```text
//! label,object_key
//! cats,cat1.mp4
//! dogs,dog1.mp4
//! ```

use std::io::Read;
use std::path::Path;
use thiserror::Error;

use crate::index::keys;
use crate::store::IndexRecord;

/// Keep at most this many per-line messages
const MAX_REPORTED_ERRORS: usize = 100;

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Header has no '{0}' column")]
    MissingColumn(&'static str),
}

/// CSV importer with configurable column positions
pub struct SeedImporter {
    label_column: usize,
    object_key_column: usize,
    has_header: bool,
}

/// Result of a seed import
#[derive(Debug)]
pub struct SeedResult {
    pub records: Vec<IndexRecord>,
    pub rows_processed: usize,
    pub rows_failed: usize,
    pub errors: Vec<String>,
}

impl Default for SeedImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl SeedImporter {
    /// Label in column 0, object key in column 1, with a header row
    pub fn new() -> Self {
        Self {
            label_column: 0,
            object_key_column: 1,
            has_header: true,
        }
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Locate the label and object key columns by header name
    fn detect_columns(&mut self, headers: &csv::StringRecord) -> Result<(), SeedError> {
        let find = |names: &[&str]| {
            headers.iter().position(|h| {
                let h = h.trim().to_lowercase().replace(['_', ' '], "");
                names.contains(&h.as_str())
            })
        };

        self.label_column = find(&["label", "tag"]).ok_or(SeedError::MissingColumn("label"))?;
        self.object_key_column = find(&["objectkey", "s3objectkey", "key", "filename"])
            .ok_or(SeedError::MissingColumn("object_key"))?;
        Ok(())
    }

    /// Import rows from a CSV file
    pub fn import(self, path: &Path) -> Result<SeedResult, SeedError> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(self.has_header)
            .flexible(true)
            .from_path(path)?;
        self.read_all(reader)
    }

    /// Import rows from any reader
    pub fn import_reader<R: Read>(self, input: R) -> Result<SeedResult, SeedError> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(self.has_header)
            .flexible(true)
            .from_reader(input);
        self.read_all(reader)
    }

    fn read_all<R: Read>(mut self, mut reader: csv::Reader<R>) -> Result<SeedResult, SeedError> {
        if self.has_header {
            let headers = reader.headers()?.clone();
            self.detect_columns(&headers)?;
        }

        let mut records = Vec::new();
        let mut rows_failed = 0;
        let mut errors = Vec::new();

        for (line_num, result) in reader.records().enumerate() {
            let actual_line = if self.has_header {
                line_num + 2
            } else {
                line_num + 1
            };

            let row = match result {
                Ok(r) => r,
                Err(e) => {
                    errors.push(format!("Line {}: {}", actual_line, e));
                    rows_failed += 1;
                    continue;
                }
            };

            let label = row.get(self.label_column).map(str::trim).unwrap_or("");
            let object_key = row.get(self.object_key_column).map(str::trim).unwrap_or("");

            if let Err(e) = keys::validate_label(label) {
                errors.push(format!("Line {}: {}", actual_line, e));
                rows_failed += 1;
                continue;
            }
            if object_key.is_empty() {
                errors.push(format!("Line {}: missing object key", actual_line));
                rows_failed += 1;
                continue;
            }

            records.push(IndexRecord::label_association(label, object_key));
        }

        if errors.len() > MAX_REPORTED_ERRORS {
            let total = errors.len();
            errors.truncate(MAX_REPORTED_ERRORS);
            errors.push(format!("... and {} more errors", total - MAX_REPORTED_ERRORS));
        }

        tracing::debug!(
            rows = records.len(),
            failed = rows_failed,
            "Seed file parsed"
        );

        Ok(SeedResult {
            rows_processed: records.len(),
            records,
            rows_failed,
            errors,
        })
    }
}
