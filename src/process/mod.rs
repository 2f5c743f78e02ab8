// src/process/mod.rs
use crate::error::EtlError;
use csv::ReaderBuilder;
use tracing::{debug, instrument};

pub mod reshape;
pub mod utils;

use utils::{clean_str, is_blank_record};

/// A header row plus string records. Every row has `headers.len()` cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Build a table, rejecting any row whose width differs from the header.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, EtlError> {
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != headers.len())
        {
            return Err(EtlError::malformed(format!(
                "row {} has {} cells, header has {}",
                idx + 1,
                row.len(),
                headers.len()
            )));
        }
        Ok(Self { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of `name` in the header, or `MalformedInput`.
    pub fn column_index(&self, name: &str) -> Result<usize, EtlError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| {
                EtlError::malformed(format!(
                    "missing column {:?} (have {:?})",
                    name, self.headers
                ))
            })
    }

    /// All values of one column, in row order.
    pub fn column(&self, name: &str) -> Result<Vec<&str>, EtlError> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| r[idx].as_str()).collect())
    }

    /// Rewrite every cell of column `name` with `f`.
    pub fn map_column<F>(&mut self, name: &str, mut f: F) -> Result<(), EtlError>
    where
        F: FnMut(&str) -> String,
    {
        let idx = self.column_index(name)?;
        for row in &mut self.rows {
            row[idx] = f(&row[idx]);
        }
        Ok(())
    }
}

/// 1-based physical line of the record whose read started at `byte`.
///
/// The reader reports the offset before any empty lines it skipped, so
/// line terminators at the offset are stepped over first.
fn line_at(text: &str, byte: u64) -> usize {
    let bytes = text.as_bytes();
    let mut start = usize::try_from(byte).unwrap_or(usize::MAX).min(bytes.len());
    while start < bytes.len() && matches!(bytes[start], b'\r' | b'\n') {
        start += 1;
    }
    bytes[..start].iter().filter(|&&b| b == b'\n').count() + 1
}

/// Parse the API's CSV body into a [`Table`].
///
/// - blank lines are skipped
/// - the first remaining record is the header, with outer quotes stripped
/// - every data record must match the header width
#[instrument(level = "debug", skip(text), fields(bytes = text.len()))]
pub fn parse_csv(text: &str) -> Result<Table, EtlError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true) // width is checked below so we can name the line
        .from_reader(text.as_bytes());

    let mut headers: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    for result in rdr.records() {
        let record =
            result.map_err(|e| EtlError::malformed(format!("CSV parse error: {}", e)))?;
        if is_blank_record(&record) {
            continue;
        }
        let line = record
            .position()
            .map(|p| line_at(text, p.byte()))
            .unwrap_or_default();

        match &headers {
            None => headers = Some(record.iter().map(clean_str).collect()),
            Some(h) if record.len() != h.len() => {
                return Err(EtlError::malformed(format!(
                    "line {}: expected {} cells, found {}",
                    line,
                    h.len(),
                    record.len()
                )));
            }
            Some(_) => rows.push(record.iter().map(str::to_string).collect()),
        }
    }

    let headers = headers.ok_or_else(|| EtlError::malformed("response body has no header row"))?;
    debug!(columns = headers.len(), rows = rows.len(), "parsed CSV");
    Table::new(headers, rows)
}
