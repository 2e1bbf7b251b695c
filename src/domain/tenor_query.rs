//! Remaining-tenor query against an arbitrary reference date.
//!
//! The remaining days are recomputed on every call from the stored end date.
//! The stored `days_remaining` snapshot is carried along untouched and never
//! consulted.

use crate::domain::dates::{self, parse_date};
use crate::domain::error::LedgerError;
use crate::domain::product::Product;
use crate::ports::product_port::ProductRepository;
use chrono::NaiveDate;

/// A product as seen from a reference date.
#[derive(Debug, Clone, PartialEq)]
pub struct TenorView {
    pub product: Product,
    pub reference_date: NaiveDate,
    /// Request-scoped; never written back to storage.
    pub remaining_days: i64,
}

/// Project products onto `reference`, dropping those without an end date.
/// Ordered by end date, then id.
pub fn project_as_of(products: Vec<Product>, reference: NaiveDate) -> Vec<TenorView> {
    let mut views: Vec<TenorView> = products
        .into_iter()
        .filter_map(|product| {
            let end = product.end_date?;
            Some(TenorView {
                remaining_days: dates::days_remaining(end, reference),
                reference_date: reference,
                product,
            })
        })
        .collect();

    views.sort_by_key(|v| (v.product.end_date, v.product.id));
    views
}

/// Every product's remaining tenor as of `reference_date`.
pub fn query_as_of(
    products: &dyn ProductRepository,
    reference_date: &str,
) -> Result<Vec<TenorView>, LedgerError> {
    let reference = parse_date(reference_date)?;
    let all = products.list_all()?;
    tracing::debug!(products = all.len(), %reference, "computing remaining tenor");
    Ok(project_as_of(all, reference))
}
