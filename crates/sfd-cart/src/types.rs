use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One line in a customer's cart. Prices are integer cents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub qty: i64,
    pub unit_price_cents: i64,
}

impl CartLine {
    pub fn new(product_id: impl Into<String>, qty: i64, unit_price_cents: i64) -> Self {
        Self {
            product_id: product_id.into(),
            qty,
            unit_price_cents,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cart {
    pub lines: Vec<CartLine>,
}

/// Product as the catalog currently knows it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,
    pub name: String,
    pub price_cents: i64,
    pub stock: i64,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Product {
    pub fn new(
        product_id: impl Into<String>,
        name: impl Into<String>,
        price_cents: i64,
        stock: i64,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            price_cents,
            stock,
            active: true,
        }
    }
}

/// Catalog keyed by product id.
pub type Catalog = BTreeMap<String, Product>;

/// Helper to build a Catalog with minimal boilerplate in tests/callers.
pub fn catalog<I>(products: I) -> Catalog
where
    I: IntoIterator<Item = Product>,
{
    products
        .into_iter()
        .map(|p| (p.product_id.clone(), p))
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartAction {
    Clean,
    Adjusted,
}

/// What was wrong with a line and what was done about it.
/// `line` is the index in the submitted cart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum CartIssue {
    /// Dropped.
    UnknownProduct { line: usize, product_id: String },
    /// Dropped.
    InactiveProduct { line: usize, product_id: String },
    /// Dropped.
    NonPositiveQty {
        line: usize,
        product_id: String,
        qty: i64,
    },
    /// Quantity added to the earlier line.
    DuplicateLine {
        line: usize,
        product_id: String,
        merged_into: usize,
    },
    /// Clamped to `available`; dropped when `available` is zero.
    QtyExceedsStock {
        line: usize,
        product_id: String,
        requested: i64,
        available: i64,
    },
    /// Unit price replaced by the catalog price.
    PriceDrift {
        line: usize,
        product_id: String,
        cart_cents: i64,
        catalog_cents: i64,
    },
}

/// Full report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartReport {
    pub action: CartAction,
    /// Two passes: drop/merge issues in line order, then stock/price issues
    /// (checked on merged quantities) in line order.
    pub issues: Vec<CartIssue>,
    /// The cleaned cart.
    pub lines: Vec<CartLine>,
}

impl CartReport {
    pub fn is_clean(&self) -> bool {
        self.action == CartAction::Clean
    }

    /// Sum of qty * unit price over the cleaned lines, saturating.
    pub fn subtotal_cents(&self) -> i64 {
        self.lines.iter().fold(0i64, |acc, l| {
            acc.saturating_add(l.qty.saturating_mul(l.unit_price_cents))
        })
    }
}
