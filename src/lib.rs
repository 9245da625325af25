//! Cart state and stock reconciliation for the hearth storefront.
//!
//! The server half ([`cart`], [`catalog`], [`stock`]) is the system of record
//! for an authenticated customer's cart and re-validates stock inside every
//! mutating transaction. The client half ([`client`]) keeps an optimistic,
//! locally persisted cart and reconciles it with the server.

pub mod app;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod client;
pub mod config;
pub mod state;
pub mod stock;
