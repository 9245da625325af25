//! Authoritative stock checks, shared by the client pre-check and every
//! mutating server transaction.

mod dto;
pub mod validator;

pub use dto::{StockCheckItem, StockIssue, StockIssueKind, StockValidation};
pub use validator::{check_items, validate_in_tx, validate_with_catalog};
