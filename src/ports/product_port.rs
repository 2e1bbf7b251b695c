//! Product persistence port.

use crate::domain::error::LedgerError;
use crate::domain::product::{NewProduct, Product, ProductPatch};

/// Storage of wealth products. "Not found" is reported as `None`/`false`.
pub trait ProductRepository {
    fn get(&self, id: i64) -> Result<Option<Product>, LedgerError>;

    /// Exact match on the yindeng code; blank codes never match.
    fn get_by_natural_code(&self, code: &str) -> Result<Option<Product>, LedgerError>;

    fn list(&self, offset: usize, limit: usize) -> Result<Vec<Product>, LedgerError>;

    fn list_all(&self) -> Result<Vec<Product>, LedgerError>;

    /// Insert a new row. A colliding natural code is a `ConstraintViolation`.
    fn create(&self, product: NewProduct) -> Result<Product, LedgerError>;

    fn update(&self, id: i64, patch: ProductPatch) -> Result<Option<Product>, LedgerError>;

    /// Overwrite the product carrying the same natural code, or insert.
    /// Products without a code are always inserted.
    fn upsert_by_natural_code(&self, product: NewProduct) -> Result<Product, LedgerError>;

    /// Upsert every product in one unit of work; nothing is kept on failure.
    fn upsert_batch(&self, products: Vec<NewProduct>) -> Result<Vec<Product>, LedgerError>;

    /// Refused with `ConstraintViolation` while transactions reference the product.
    fn delete(&self, id: i64) -> Result<bool, LedgerError>;
}
