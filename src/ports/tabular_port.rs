//! Tabular row source/sink ports used by bulk import and export.

use crate::domain::error::LedgerError;
use std::collections::HashMap;

/// One row keyed by column header.
pub type Record = HashMap<String, String>;

pub trait RowSource {
    fn read_rows(&self) -> Result<Vec<Record>, LedgerError>;
}

pub trait RowSink {
    fn write_rows(&self, headers: &[&str], rows: &[Vec<String>]) -> Result<(), LedgerError>;
}
