//! Asset persistence port.

use crate::domain::asset::{Asset, AssetPatch, NewAsset};
use crate::domain::error::LedgerError;

pub trait AssetRepository {
    fn create(&self, asset: NewAsset) -> Result<Asset, LedgerError>;
    fn get(&self, id: i64) -> Result<Option<Asset>, LedgerError>;
    fn get_by_code(&self, code: &str) -> Result<Option<Asset>, LedgerError>;
    fn list(&self, offset: usize, limit: usize) -> Result<Vec<Asset>, LedgerError>;
    fn update(&self, id: i64, patch: AssetPatch) -> Result<Option<Asset>, LedgerError>;
    /// Refused with `ConstraintViolation` while transactions reference the asset.
    fn delete(&self, id: i64) -> Result<bool, LedgerError>;
}
