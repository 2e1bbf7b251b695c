#![allow(dead_code)]

use chrono::NaiveDate;
use std::cell::RefCell;
use wealthledger::adapters::sqlite::SqliteDatabase;
use wealthledger::domain::asset::NewAsset;
use wealthledger::domain::error::LedgerError;
use wealthledger::domain::product::NewProduct;
use wealthledger::ports::tabular_port::{Record, RowSink, RowSource};

/// In-memory row source for driving the import pipeline without files.
pub struct MockRowSource {
    pub rows: Vec<Record>,
}

impl MockRowSource {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn with_row(mut self, pairs: &[(&str, &str)]) -> Self {
        self.rows.push(record(pairs));
        self
    }
}

impl RowSource for MockRowSource {
    fn read_rows(&self) -> Result<Vec<Record>, LedgerError> {
        Ok(self.rows.clone())
    }
}

/// Captures what the export pipeline writes.
#[derive(Default)]
pub struct RecordingSink {
    pub headers: RefCell<Vec<String>>,
    pub rows: RefCell<Vec<Vec<String>>>,
}

impl RowSink for RecordingSink {
    fn write_rows(&self, headers: &[&str], rows: &[Vec<String>]) -> Result<(), LedgerError> {
        *self.headers.borrow_mut() = headers.iter().map(|h| h.to_string()).collect();
        *self.rows.borrow_mut() = rows.to_vec();
        Ok(())
    }
}

impl RecordingSink {
    /// Value of `column` in every written row.
    pub fn column(&self, column: &str) -> Vec<String> {
        let idx = self
            .headers
            .borrow()
            .iter()
            .position(|h| h == column)
            .unwrap();
        self.rows.borrow().iter().map(|r| r[idx].clone()).collect()
    }
}

pub fn record(pairs: &[(&str, &str)]) -> Record {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn empty_db() -> SqliteDatabase {
    let db = SqliteDatabase::in_memory().unwrap();
    db.initialize_schema().unwrap();
    db
}

pub fn make_product(name: &str, code: &str, start: NaiveDate, end: NaiveDate) -> NewProduct {
    NewProduct::new(name, Some(start), Some(end)).with_yindeng_code(code)
}

pub fn make_asset(name: &str, code: &str, asset_type: &str) -> NewAsset {
    NewAsset::new(name, asset_type).with_code(code)
}
