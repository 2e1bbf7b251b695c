//! Core domain types and logic.

pub mod amount;
pub mod asset;
pub mod dates;
pub mod error;
pub mod ingest;
pub mod product;
pub mod tenor_query;
pub mod transaction;
