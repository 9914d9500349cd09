//! `sfd cart validate`: run the cart cleanup against a catalog snapshot.

use anyhow::{bail, Context, Result};
use sfd_cart::{catalog, validate_cart, Cart, Product};
use tracing::info;

use super::read_json_file;

/// Prints a summary line followed by the full report as pretty JSON.
pub fn validate(cart_path: &str, catalog_path: &str, strict: bool) -> Result<()> {
    let cart: Cart = read_json_file(cart_path)?;
    let products: Vec<Product> = read_json_file(catalog_path)?;
    let catalog = catalog(products);

    let report = validate_cart(&cart.lines, &catalog);
    info!(
        lines_in = cart.lines.len(),
        lines_out = report.lines.len(),
        issues = report.issues.len(),
        "cart validated"
    );

    println!(
        "clean={} issues={} lines={} subtotal_cents={}",
        report.is_clean(),
        report.issues.len(),
        report.lines.len(),
        report.subtotal_cents()
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("serialize cart report")?
    );

    if strict && !report.is_clean() {
        bail!(
            "CART_ADJUSTED: {} issue(s) found; see report above",
            report.issues.len()
        );
    }
    Ok(())
}
