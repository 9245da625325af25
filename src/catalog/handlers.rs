use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{error, instrument};
use uuid::Uuid;

use super::CatalogProduct;
use crate::state::AppState;

pub fn catalog_routes() -> Router<AppState> {
    Router::new().route("/products/:id/stock", get(get_product_stock))
}

/// GET /products/:id/stock: current stock for the client's stale-cache refresh.
#[instrument(skip(state))]
pub async fn get_product_stock(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CatalogProduct>, (StatusCode, String)> {
    match state.catalog.get_product(id).await {
        Ok(Some(product)) => Ok(Json(product)),
        Ok(None) => Err((StatusCode::NOT_FOUND, "Product not found".into())),
        Err(e) => {
            error!(error = %e, %id, "catalog lookup failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "catalog lookup failed".into()))
        }
    }
}
