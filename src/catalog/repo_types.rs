use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Product record as the cart sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProduct {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub price_cents: i64,
    pub stock_quantity: i32,
    pub is_active: bool,
    pub image_url: Option<String>,
}
