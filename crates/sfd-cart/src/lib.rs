//! sfd-cart
//!
//! Cart validation and cleanup against catalog product data.
//! - Lines for unknown or inactive products are dropped
//! - Non-positive quantities are dropped
//! - Duplicate product lines are merged into the first one
//! - Quantities are clamped to stock; out-of-stock lines are dropped
//! - Stale unit prices are refreshed from the catalog
//!
//! Deterministic, pure logic. No IO.

mod engine;
mod types;

pub use engine::validate_cart;
pub use types::*;
