//! Server-side cart: the system of record for an authenticated customer's
//! cart. Every operation runs in one transaction and re-validates stock
//! before it commits.

pub mod dto;
mod error;
pub mod handlers;
pub mod memory;
pub mod repo;
mod repo_types;
pub mod services;
pub mod store;

use crate::state::AppState;
use axum::Router;

pub use error::CartError;
pub use repo_types::{CartItem, CartLine};

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes())
}
