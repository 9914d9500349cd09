use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// OrderStatus
// ---------------------------------------------------------------------------

/// Every lifecycle state a storefront order can occupy.
///
/// Text form (wire, config, CLI) is the lowercase variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Placed by the customer, not yet looked at. Initial state.
    Pending,
    /// Accepted by the shop.
    Confirmed,
    /// Being picked and packed.
    Processing,
    /// Handed to the carrier.
    Shipped,
    /// Received by the customer. Only a return can follow.
    Delivered,
    /// Cancelled. **Terminal.**
    Cancelled,
    /// Returned after delivery. **Terminal.**
    Returned,
}

impl OrderStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Returned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Returned => "returned",
        }
    }

    /// Lenient lookup: trims and ignores ASCII case. `None` for anything
    /// outside the closed set.
    pub fn from_label(label: &str) -> Option<Self> {
        let t = label.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.as_str().eq_ignore_ascii_case(t))
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| UnknownStatus {
            label: s.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// UnknownStatus
// ---------------------------------------------------------------------------

/// A status label that is not one of the seven known statuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus {
    pub label: String,
}

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown order status '{}'. expected one of: pending | confirmed | processing | shipped | delivered | cancelled | returned",
            self.label
        )
    }
}

impl std::error::Error for UnknownStatus {}
