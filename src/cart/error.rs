use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use uuid::Uuid;

use super::dto::ErrorBody;
use crate::stock::StockIssue;

#[derive(Debug, Error)]
pub enum CartError {
    #[error("stock validation failed for {} item(s)", .0.len())]
    Validation(Vec<StockIssue>),

    #[error("invalid quantity {0}")]
    InvalidQuantity(i32),

    #[error("cart item {0} not found")]
    ItemNotFound(Uuid),

    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl IntoResponse for CartError {
    fn into_response(self) -> Response {
        let status = match &self {
            CartError::Validation(_) | CartError::InvalidQuantity(_) => StatusCode::BAD_REQUEST,
            CartError::ItemNotFound(_) => StatusCode::NOT_FOUND,
            CartError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = match self {
            CartError::Validation(items) => ErrorBody {
                error: format!("stock validation failed for {} item(s)", items.len()),
                items,
            },
            CartError::Storage(e) => {
                tracing::error!(error = %format!("{e:#}"), "cart storage failure");
                ErrorBody::message("cart storage failure")
            }
            other => ErrorBody::message(other.to_string()),
        };
        (status, Json(body)).into_response()
    }
}
