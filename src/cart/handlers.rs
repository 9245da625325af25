use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use tracing::{error, instrument};
use uuid::Uuid;

use super::dto::{AddItemRequest, CartView, SyncCartRequest, UpdateQuantityRequest, ValidateCartRequest};
use super::error::CartError;
use super::repo_types::CartItem;
use super::services;
use crate::{auth::AuthUser, state::AppState, stock::{validate_with_catalog, StockValidation}};

// --- public routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(get_cart))
        .route("/cart/validate", post(validate_cart))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/cart/sync", post(sync_cart))
        .route("/cart/items", post(add_item))
        .route("/cart/items/:id", patch(update_item).delete(remove_item))
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn get_cart(
    State(state): State<AppState>,
    AuthUser(customer_id): AuthUser,
) -> Result<Json<CartView>, CartError> {
    let view = services::get_user_cart(state.db.as_ref(), customer_id).await?;
    Ok(Json(view))
}

/// POST /cart/sync { items: [{productId, quantity}] }
#[instrument(skip(state, body))]
pub async fn sync_cart(
    State(state): State<AppState>,
    AuthUser(customer_id): AuthUser,
    Json(body): Json<SyncCartRequest>,
) -> Result<Json<CartView>, CartError> {
    let view = services::sync_user_cart(state.db.as_ref(), customer_id, body.items).await?;
    Ok(Json(view))
}

/// POST /cart/items { productId, quantity? }
#[instrument(skip(state))]
pub async fn add_item(
    State(state): State<AppState>,
    AuthUser(customer_id): AuthUser,
    Json(body): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<CartItem>), CartError> {
    let item =
        services::add_item_to_cart(state.db.as_ref(), customer_id, body.product_id, body.quantity)
            .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// PATCH /cart/items/:id { quantity }. Zero removes the line (204).
#[instrument(skip(state))]
pub async fn update_item(
    State(state): State<AppState>,
    AuthUser(customer_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateQuantityRequest>,
) -> Result<Response, CartError> {
    let updated =
        services::update_cart_item_quantity(state.db.as_ref(), customer_id, id, body.quantity)
            .await?;
    Ok(match updated {
        Some(item) => Json(item).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

#[instrument(skip(state))]
pub async fn remove_item(
    State(state): State<AppState>,
    AuthUser(customer_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, CartError> {
    services::remove_item_from_cart(state.db.as_ref(), customer_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /cart/validate: advisory pre-check before checkout; open to
/// anonymous carts.
#[instrument(skip(state, body))]
pub async fn validate_cart(
    State(state): State<AppState>,
    Json(body): Json<ValidateCartRequest>,
) -> Result<Json<StockValidation>, (StatusCode, String)> {
    validate_with_catalog(state.catalog.as_ref(), &body.items)
        .await
        .map(Json)
        .map_err(|e| {
            error!(error = %e, "stock pre-check failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "stock pre-check failed".into())
        })
}
