//! CSV-backed tabular source and sink for product import/export.

use crate::domain::error::LedgerError;
use crate::ports::tabular_port::{Record, RowSink, RowSource};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Only comma-separated files are handled; spreadsheet formats are refused.
fn check_format(path: &Path) -> Result<(), LedgerError> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "csv" => Ok(()),
        _ => Err(LedgerError::UnsupportedFormat { extension }),
    }
}

fn tabular_error(path: &Path, e: csv::Error) -> LedgerError {
    LedgerError::Tabular {
        reason: format!("{}: {}", path.display(), e),
    }
}

pub struct CsvRowSource {
    path: PathBuf,
}

impl CsvRowSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LedgerError> {
        let path = path.as_ref();
        check_format(path)?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl RowSource for CsvRowSource {
    fn read_rows(&self) -> Result<Vec<Record>, LedgerError> {
        let file = File::open(&self.path)?;
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(file);

        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| tabular_error(&self.path, e))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| tabular_error(&self.path, e))?;
            let row: Record = headers
                .iter()
                .zip(record.iter())
                .filter(|(header, _)| !header.is_empty())
                .map(|(header, cell)| (header.clone(), cell.to_string()))
                .collect();
            rows.push(row);
        }

        tracing::debug!(path = %self.path.display(), rows = rows.len(), "read csv rows");
        Ok(rows)
    }
}

pub struct CsvRowSink {
    path: PathBuf,
}

impl CsvRowSink {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, LedgerError> {
        let path = path.as_ref();
        check_format(path)?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl RowSink for CsvRowSink {
    fn write_rows(&self, headers: &[&str], rows: &[Vec<String>]) -> Result<(), LedgerError> {
        let mut wtr = csv::Writer::from_path(&self.path).map_err(|e| tabular_error(&self.path, e))?;
        wtr.write_record(headers)
            .map_err(|e| tabular_error(&self.path, e))?;
        for row in rows {
            wtr.write_record(row)
                .map_err(|e| tabular_error(&self.path, e))?;
        }
        wtr.flush()?;
        Ok(())
    }
}
