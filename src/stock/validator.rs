use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use super::dto::{StockCheckItem, StockIssue, StockIssueKind, StockValidation};
use crate::cart::store::CartTx;
use crate::catalog::{Catalog, CatalogProduct};

/// Check a single item against the product it refers to, if any.
pub fn check_item(item: &StockCheckItem, product: Option<&CatalogProduct>) -> Option<StockIssue> {
    let issue = |kind, message: &str, available_stock| StockIssue {
        product_id: item.product_id,
        kind,
        message: message.to_string(),
        available_stock,
    };

    match product {
        None => Some(issue(StockIssueKind::NotFound, "product not found", 0)),
        Some(p) if !p.is_active => Some(issue(
            StockIssueKind::Unavailable,
            "product is no longer available",
            0,
        )),
        Some(p) if item.quantity > p.stock_quantity => Some(issue(
            StockIssueKind::InsufficientStock,
            "insufficient stock",
            p.stock_quantity.max(0),
        )),
        Some(_) => None,
    }
}

/// Check every item independently; one failure never hides another.
pub fn check_items(
    items: &[StockCheckItem],
    products: &HashMap<Uuid, CatalogProduct>,
) -> StockValidation {
    let errors = items
        .iter()
        .filter_map(|item| check_item(item, products.get(&item.product_id)))
        .collect();
    StockValidation::from_issues(errors)
}

/// Advisory check against a catalog outside any transaction.
pub async fn validate_with_catalog(
    catalog: &dyn Catalog,
    items: &[StockCheckItem],
) -> anyhow::Result<StockValidation> {
    let mut products = HashMap::with_capacity(items.len());
    for item in items {
        if products.contains_key(&item.product_id) {
            continue;
        }
        if let Some(p) = catalog.get_product(item.product_id).await? {
            products.insert(item.product_id, p);
        }
    }
    let report = check_items(items, &products);
    debug!(items = items.len(), valid = report.valid, "stock pre-check");
    Ok(report)
}

/// Binding check that reads products through the caller's transaction.
pub async fn validate_in_tx(
    tx: &mut dyn CartTx,
    items: &[StockCheckItem],
) -> anyhow::Result<StockValidation> {
    let mut products = HashMap::with_capacity(items.len());
    for item in items {
        if products.contains_key(&item.product_id) {
            continue;
        }
        if let Some(p) = tx.product(item.product_id).await? {
            products.insert(item.product_id, p);
        }
    }
    Ok(check_items(items, &products))
}
