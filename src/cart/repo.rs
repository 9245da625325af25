use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::repo_types::{CartItem, CartLine};
use super::store::{CartDb, CartTx};
use crate::catalog::{repo::fetch_product, CatalogProduct};

const ITEM_COLUMNS: &str = "id, customer_id, product_id, quantity, added_at, updated_at";

#[derive(Clone)]
pub struct PgCartDb {
    db: PgPool,
}

impl PgCartDb {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CartDb for PgCartDb {
    async fn begin(&self) -> anyhow::Result<Box<dyn CartTx>> {
        let tx = self.db.begin().await.context("begin tx")?;
        Ok(Box::new(PgCartTx { tx }))
    }
}

pub struct PgCartTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl CartTx for PgCartTx {
    async fn product(&mut self, product_id: Uuid) -> anyhow::Result<Option<CatalogProduct>> {
        fetch_product(&mut *self.tx, product_id).await
    }

    async fn ensure_customer(&mut self, customer_id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO customers (id)
            VALUES ($1)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(customer_id)
        .execute(&mut *self.tx)
        .await
        .context("ensure customer")?;
        Ok(())
    }

    async fn cart_lines(&mut self, customer_id: Uuid) -> anyhow::Result<Vec<CartLine>> {
        let rows = sqlx::query_as::<_, CartLine>(
            r#"
            SELECT ci.id, ci.product_id, ci.quantity,
                   p.name, p.sku, p.price_cents, p.stock_quantity, p.is_active, p.image_url
              FROM cart_items ci
              JOIN products p ON p.id = ci.product_id
             WHERE ci.customer_id = $1
             ORDER BY ci.added_at ASC, ci.id ASC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&mut *self.tx)
        .await
        .context("list cart lines")?;
        Ok(rows)
    }

    async fn cart_item(&mut self, item_id: Uuid) -> anyhow::Result<Option<CartItem>> {
        let row = sqlx::query_as::<_, CartItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM cart_items WHERE id = $1"
        ))
        .bind(item_id)
        .fetch_optional(&mut *self.tx)
        .await
        .context("get cart item")?;
        Ok(row)
    }

    async fn cart_item_for_product(
        &mut self,
        customer_id: Uuid,
        product_id: Uuid,
    ) -> anyhow::Result<Option<CartItem>> {
        let row = sqlx::query_as::<_, CartItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM cart_items WHERE customer_id = $1 AND product_id = $2"
        ))
        .bind(customer_id)
        .bind(product_id)
        .fetch_optional(&mut *self.tx)
        .await
        .context("get cart item by product")?;
        Ok(row)
    }

    async fn upsert_item(
        &mut self,
        customer_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> anyhow::Result<CartItem> {
        let row = sqlx::query_as::<_, CartItem>(&format!(
            r#"
            INSERT INTO cart_items (id, customer_id, product_id, quantity)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (customer_id, product_id)
            DO UPDATE SET quantity = EXCLUDED.quantity, updated_at = now()
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(customer_id)
        .bind(product_id)
        .bind(quantity)
        .fetch_one(&mut *self.tx)
        .await
        .context("upsert cart item")?;
        Ok(row)
    }

    async fn set_quantity(&mut self, item_id: Uuid, quantity: i32) -> anyhow::Result<CartItem> {
        let row = sqlx::query_as::<_, CartItem>(&format!(
            r#"
            UPDATE cart_items
               SET quantity = $2, updated_at = now()
             WHERE id = $1
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(item_id)
        .bind(quantity)
        .fetch_one(&mut *self.tx)
        .await
        .context("update cart item quantity")?;
        Ok(row)
    }

    async fn delete_item(&mut self, item_id: Uuid) -> anyhow::Result<bool> {
        let done = sqlx::query("DELETE FROM cart_items WHERE id = $1")
            .bind(item_id)
            .execute(&mut *self.tx)
            .await
            .context("delete cart item")?;
        Ok(done.rows_affected() > 0)
    }

    async fn delete_all(&mut self, customer_id: Uuid) -> anyhow::Result<u64> {
        let done = sqlx::query("DELETE FROM cart_items WHERE customer_id = $1")
            .bind(customer_id)
            .execute(&mut *self.tx)
            .await
            .context("clear cart items")?;
        Ok(done.rows_affected())
    }

    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        self.tx.commit().await.context("commit tx")?;
        Ok(())
    }
}
