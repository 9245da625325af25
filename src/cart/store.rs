use async_trait::async_trait;
use uuid::Uuid;

use super::repo_types::{CartItem, CartLine};
use crate::catalog::CatalogProduct;

/// Source of cart transactions.
#[async_trait]
pub trait CartDb: Send + Sync {
    async fn begin(&self) -> anyhow::Result<Box<dyn CartTx>>;
}

/// One open transaction. Dropping it without [`CartTx::commit`] rolls back
/// every write made through it.
#[async_trait]
pub trait CartTx: Send {
    async fn product(&mut self, product_id: Uuid) -> anyhow::Result<Option<CatalogProduct>>;

    /// Create the customer row if it does not exist yet.
    async fn ensure_customer(&mut self, customer_id: Uuid) -> anyhow::Result<()>;

    /// All rows for the customer joined with current product data, oldest first.
    async fn cart_lines(&mut self, customer_id: Uuid) -> anyhow::Result<Vec<CartLine>>;

    async fn cart_item(&mut self, item_id: Uuid) -> anyhow::Result<Option<CartItem>>;

    async fn cart_item_for_product(
        &mut self,
        customer_id: Uuid,
        product_id: Uuid,
    ) -> anyhow::Result<Option<CartItem>>;

    /// Insert the row or overwrite its quantity.
    async fn upsert_item(
        &mut self,
        customer_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> anyhow::Result<CartItem>;

    async fn set_quantity(&mut self, item_id: Uuid, quantity: i32) -> anyhow::Result<CartItem>;

    async fn delete_item(&mut self, item_id: Uuid) -> anyhow::Result<bool>;

    async fn delete_all(&mut self, customer_id: Uuid) -> anyhow::Result<u64>;

    async fn commit(self: Box<Self>) -> anyhow::Result<()>;
}
