//! Transaction persistence port.

use crate::domain::error::LedgerError;
use crate::domain::transaction::{NewTransaction, Transaction, TransactionPatch};
use chrono::NaiveDate;

pub trait TransactionRepository {
    /// Derives the settlement amount before insert. Unknown product or asset
    /// ids are a `ConstraintViolation`.
    fn create(&self, tx: NewTransaction) -> Result<Transaction, LedgerError>;
    fn get(&self, id: i64) -> Result<Option<Transaction>, LedgerError>;
    fn list(&self, offset: usize, limit: usize) -> Result<Vec<Transaction>, LedgerError>;
    fn list_by_product(&self, product_id: i64) -> Result<Vec<Transaction>, LedgerError>;
    fn list_by_asset(&self, asset_id: i64) -> Result<Vec<Transaction>, LedgerError>;
    /// Inclusive on both ends of the investment date.
    fn list_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Transaction>, LedgerError>;
    fn update(&self, id: i64, patch: TransactionPatch)
    -> Result<Option<Transaction>, LedgerError>;
    fn delete(&self, id: i64) -> Result<bool, LedgerError>;
}
