//! Storefront side of the cart: the local store, its durable copy, and the
//! background sync with the cart service.

pub mod api;
pub mod coordinator;
pub mod merge;
pub mod model;
pub mod repository;
pub mod retry;
pub mod scheduler;
pub mod store;

pub use api::{CartApi, HttpCartApi, Session, SyncError};
pub use coordinator::{CartSyncCoordinator, IdentityEvent, SharedCartStore, SyncStatus};
pub use model::{Cart, CartLineItem, CartNotice, CartTotals, NewLineItem};
pub use repository::{CartRepository, JsonFileRepository, MemoryRepository, RepositoryError};
pub use retry::RetryPolicy;
pub use store::{transition, CartAction, CartStore, Transition};
