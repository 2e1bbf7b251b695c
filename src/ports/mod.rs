//! Port traits at the seams between domain logic and adapters.

pub mod asset_port;
pub mod config_port;
pub mod product_port;
pub mod tabular_port;
pub mod transaction_port;
