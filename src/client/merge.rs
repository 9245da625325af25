use uuid::Uuid;

use super::model::CartLineItem;
use crate::cart::CartLine;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub items: Vec<CartLineItem>,
    /// The merged cart differs from what the server holds.
    pub needs_push: bool,
}

/// Reconcile the guest cart with the server cart at login.
///
/// The server line wins for any product present on both sides, so a stale
/// guest quantity never overrides the account. Guest-only products are kept
/// after the server lines. A server line that can no longer be held (inactive
/// or out of stock) is dropped together with any guest line for the product.
/// Server lines keep the local line id when the product was already in the
/// guest cart.
pub fn merge_on_login(server: &[CartLine], local: &[CartLineItem]) -> MergeOutcome {
    let mut items: Vec<CartLineItem> = Vec::with_capacity(server.len() + local.len());
    let mut dropped_server_line = false;

    for line in server {
        let id = local
            .iter()
            .find(|l| l.product_id == line.product_id)
            .map(|l| l.id)
            .unwrap_or_else(Uuid::new_v4);
        match CartLineItem::from_server_line(line, id) {
            Some(item) if items.iter().all(|i| i.product_id != item.product_id) => {
                dropped_server_line |= i64::from(item.quantity) != i64::from(line.quantity);
                items.push(item);
            }
            _ => dropped_server_line = true,
        }
    }

    let mut added_local = false;
    for l in local {
        // a server line dropped for stock still shadows the guest line
        let on_server = server.iter().any(|s| s.product_id == l.product_id);
        if !on_server && items.iter().all(|i| i.product_id != l.product_id) {
            items.push(l.clone());
            added_local = true;
        }
    }

    MergeOutcome {
        needs_push: added_local || dropped_server_line,
        items,
    }
}
