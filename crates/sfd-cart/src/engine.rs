use std::collections::BTreeMap;

use crate::{CartAction, CartIssue, CartLine, CartReport, Catalog, Product};

// A surviving line and the index it had in the submitted cart.
struct Kept {
    line: usize,
    item: CartLine,
}

/// Deterministic cleanup:
/// 1) drop unknown / inactive / non-positive lines, merge duplicates
/// 2) clamp to stock, refresh prices
pub fn validate_cart(lines: &[CartLine], catalog: &Catalog) -> CartReport {
    let mut issues: Vec<CartIssue> = Vec::new();
    let mut kept: Vec<Kept> = Vec::new();
    // product_id -> index into `kept`
    let mut first_seen: BTreeMap<&str, usize> = BTreeMap::new();

    // 1) Integrity against the catalog
    for (idx, item) in lines.iter().enumerate() {
        let Some(product) = catalog.get(&item.product_id) else {
            issues.push(CartIssue::UnknownProduct {
                line: idx,
                product_id: item.product_id.clone(),
            });
            continue;
        };

        if !product.active {
            issues.push(CartIssue::InactiveProduct {
                line: idx,
                product_id: item.product_id.clone(),
            });
            continue;
        }

        if item.qty <= 0 {
            issues.push(CartIssue::NonPositiveQty {
                line: idx,
                product_id: item.product_id.clone(),
                qty: item.qty,
            });
            continue;
        }

        if let Some(&k) = first_seen.get(item.product_id.as_str()) {
            let target = &mut kept[k];
            target.item.qty = target.item.qty.saturating_add(item.qty);
            issues.push(CartIssue::DuplicateLine {
                line: idx,
                product_id: item.product_id.clone(),
                merged_into: target.line,
            });
            continue;
        }

        first_seen.insert(item.product_id.as_str(), kept.len());
        kept.push(Kept {
            line: idx,
            item: item.clone(),
        });
    }

    // 2) Stock and price, on merged quantities
    let mut cleaned: Vec<CartLine> = Vec::with_capacity(kept.len());
    for Kept { line, mut item } in kept {
        // Present: only catalog hits survive step 1.
        let Some(product) = catalog.get(&item.product_id) else {
            continue;
        };

        if !apply_stock(line, &mut item, product, &mut issues) {
            continue;
        }

        if item.unit_price_cents != product.price_cents {
            issues.push(CartIssue::PriceDrift {
                line,
                product_id: item.product_id.clone(),
                cart_cents: item.unit_price_cents,
                catalog_cents: product.price_cents,
            });
            item.unit_price_cents = product.price_cents;
        }

        cleaned.push(item);
    }

    let action = if issues.is_empty() {
        CartAction::Clean
    } else {
        CartAction::Adjusted
    };

    CartReport {
        action,
        issues,
        lines: cleaned,
    }
}

/// Returns false when the line must be dropped.
fn apply_stock(
    line: usize,
    item: &mut CartLine,
    product: &Product,
    issues: &mut Vec<CartIssue>,
) -> bool {
    if item.qty <= product.stock {
        return true;
    }
    let available = product.stock.max(0);
    issues.push(CartIssue::QtyExceedsStock {
        line,
        product_id: item.product_id.clone(),
        requested: item.qty,
        available,
    });
    if available == 0 {
        return false;
    }
    item.qty = available;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;

    #[test]
    fn empty_cart_is_clean() {
        let r = validate_cart(&[], &Catalog::new());
        assert!(r.is_clean());
        assert!(r.lines.is_empty());
        assert_eq!(r.subtotal_cents(), 0);
    }

    #[test]
    fn negative_stock_counts_as_zero() {
        let cat = catalog([Product::new("p1", "Mug", 900, -3)]);
        let r = validate_cart(&[CartLine::new("p1", 1, 900)], &cat);
        assert!(r.lines.is_empty());
        assert_eq!(
            r.issues,
            vec![CartIssue::QtyExceedsStock {
                line: 0,
                product_id: "p1".to_string(),
                requested: 1,
                available: 0,
            }]
        );
    }
}
