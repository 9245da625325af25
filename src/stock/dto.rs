use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One `{productId, quantity}` pair, as pushed by the client and checked
/// against the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockCheckItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

impl StockCheckItem {
    pub fn new(product_id: Uuid, quantity: i32) -> Self {
        Self { product_id, quantity }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockIssueKind {
    NotFound,
    Unavailable,
    InsufficientStock,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockIssue {
    pub product_id: Uuid,
    pub kind: StockIssueKind,
    pub message: String,
    pub available_stock: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockValidation {
    pub valid: bool,
    pub errors: Vec<StockIssue>,
}

impl StockValidation {
    pub fn from_issues(errors: Vec<StockIssue>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}
