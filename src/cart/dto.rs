use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::CartLine;
use crate::stock::{StockCheckItem, StockIssue};

/// Authoritative cart as returned by `GET /cart` and `POST /cart/sync`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub total_cents: i64,
    pub item_count: i64,
}

impl CartView {
    /// Totals come from the product's current price, never a stored snapshot.
    pub fn from_lines(items: Vec<CartLine>) -> Self {
        let total_cents = items
            .iter()
            .map(|l| l.price_cents * i64::from(l.quantity))
            .sum();
        let item_count = items.iter().map(|l| i64::from(l.quantity)).sum();
        Self {
            items,
            total_cents,
            item_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncCartRequest {
    pub items: Vec<StockCheckItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: Uuid,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateCartRequest {
    pub items: Vec<StockCheckItem>,
}

/// JSON error envelope; `items` carries per-item stock detail when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<StockIssue>,
}

impl ErrorBody {
    pub fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            items: Vec::new(),
        }
    }
}
