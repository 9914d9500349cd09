//! Command handler modules for sfd-cli.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod cart;
pub mod workflow;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use sfd_orders::OrderStatus;
use std::fs;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Parse a CLI status label (case-insensitive).
pub fn parse_status(flag: &str, label: &str) -> Result<OrderStatus> {
    label.parse::<OrderStatus>().with_context(|| {
        format!(
            "UNKNOWN_STATUS: invalid {flag} '{label}'. expected one of: {}",
            OrderStatus::ALL
                .iter()
                .map(OrderStatus::as_str)
                .collect::<Vec<_>>()
                .join(" | ")
        )
    })
}

/// Read a JSON file, tolerating a UTF-8 BOM.
pub fn read_json_file<T: DeserializeOwned>(path: &str) -> Result<T> {
    let bytes = fs::read(path).with_context(|| format!("read failed: {path}"))?;
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(&bytes);
    let raw = std::str::from_utf8(bytes).with_context(|| format!("{path} must be UTF-8 text"))?;
    serde_json::from_str(raw.trim()).with_context(|| format!("{path} must contain valid JSON"))
}

/// Comma-joined status list (empty string for none).
pub fn join_statuses(statuses: &[OrderStatus]) -> String {
    statuses
        .iter()
        .map(OrderStatus::as_str)
        .collect::<Vec<_>>()
        .join(",")
}
