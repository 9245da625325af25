//! Read-only view of the product catalog. The catalog itself is owned by the
//! storefront; the cart only needs current stock, availability and price.

pub mod handlers;
pub mod repo;
mod repo_types;

use async_trait::async_trait;
use axum::Router;
use uuid::Uuid;

use crate::state::AppState;

pub use repo_types::CatalogProduct;

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn get_product(&self, product_id: Uuid) -> anyhow::Result<Option<CatalogProduct>>;
}

pub fn router() -> Router<AppState> {
    handlers::catalog_routes()
}
