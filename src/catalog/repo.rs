use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::{Catalog, CatalogProduct};

/// Load one product through any executor, so the same query serves both the
/// pool and an open cart transaction.
pub(crate) async fn fetch_product<'e, E>(executor: E, product_id: Uuid) -> anyhow::Result<Option<CatalogProduct>>
where
    E: PgExecutor<'e>,
{
    let product = sqlx::query_as::<_, CatalogProduct>(
        r#"
        SELECT id, sku, name, price_cents, stock_quantity, is_active, image_url
          FROM products
         WHERE id = $1
        "#,
    )
    .bind(product_id)
    .fetch_optional(executor)
    .await
    .context("fetch product")?;
    Ok(product)
}

#[derive(Clone)]
pub struct PgCatalog {
    db: PgPool,
}

impl PgCatalog {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Catalog for PgCatalog {
    async fn get_product(&self, product_id: Uuid) -> anyhow::Result<Option<CatalogProduct>> {
        fetch_product(&self.db, product_id).await
    }
}
