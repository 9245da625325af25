use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::CartView;
use super::error::CartError;
use super::repo_types::CartItem;
use super::store::CartDb;
use crate::stock::{validate_in_tx, StockCheckItem};

#[instrument(skip(db))]
pub async fn get_user_cart(db: &dyn CartDb, customer_id: Uuid) -> Result<CartView, CartError> {
    let mut tx = db.begin().await?;
    let lines = tx.cart_lines(customer_id).await?;
    tx.commit().await?;
    Ok(CartView::from_lines(lines))
}

/// Replace the customer's cart with `items`, all or nothing.
#[instrument(skip(db, items), fields(items = items.len()))]
pub async fn sync_user_cart(
    db: &dyn CartDb,
    customer_id: Uuid,
    items: Vec<StockCheckItem>,
) -> Result<CartView, CartError> {
    let items = normalize_sync_items(items)?;

    let mut tx = db.begin().await?;
    tx.ensure_customer(customer_id).await?;
    let removed = tx.delete_all(customer_id).await?;

    let report = validate_in_tx(tx.as_mut(), &items).await?;
    if !report.valid {
        warn!(%customer_id, failed = report.errors.len(), "cart sync rejected");
        return Err(CartError::Validation(report.errors));
    }

    for item in &items {
        tx.upsert_item(customer_id, item.product_id, item.quantity).await?;
    }
    let lines = tx.cart_lines(customer_id).await?;
    tx.commit().await?;

    info!(%customer_id, removed, inserted = items.len(), "cart synced");
    Ok(CartView::from_lines(lines))
}

#[instrument(skip(db))]
pub async fn add_item_to_cart(
    db: &dyn CartDb,
    customer_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> Result<CartItem, CartError> {
    if quantity < 1 {
        return Err(CartError::InvalidQuantity(quantity));
    }

    let mut tx = db.begin().await?;
    tx.ensure_customer(customer_id).await?;

    let existing = tx
        .cart_item_for_product(customer_id, product_id)
        .await?
        .map(|i| i.quantity)
        .unwrap_or(0);
    let total_quantity = existing.saturating_add(quantity);

    let report = validate_in_tx(
        tx.as_mut(),
        &[StockCheckItem::new(product_id, total_quantity)],
    )
    .await?;
    if !report.valid {
        warn!(%customer_id, %product_id, total_quantity, "add to cart rejected");
        return Err(CartError::Validation(report.errors));
    }

    let item = tx.upsert_item(customer_id, product_id, total_quantity).await?;
    tx.commit().await?;
    info!(%customer_id, %product_id, quantity = item.quantity, "cart item added");
    Ok(item)
}

/// Set one line's quantity. Zero removes the line and yields `None`.
#[instrument(skip(db))]
pub async fn update_cart_item_quantity(
    db: &dyn CartDb,
    customer_id: Uuid,
    item_id: Uuid,
    quantity: i32,
) -> Result<Option<CartItem>, CartError> {
    if quantity < 0 {
        return Err(CartError::InvalidQuantity(quantity));
    }

    let mut tx = db.begin().await?;
    let item = tx
        .cart_item(item_id)
        .await?
        .filter(|i| i.customer_id == customer_id)
        .ok_or(CartError::ItemNotFound(item_id))?;

    if quantity == 0 {
        tx.delete_item(item_id).await?;
        tx.commit().await?;
        info!(%customer_id, %item_id, "cart item removed by zero quantity");
        return Ok(None);
    }

    let report = validate_in_tx(
        tx.as_mut(),
        &[StockCheckItem::new(item.product_id, quantity)],
    )
    .await?;
    if !report.valid {
        warn!(%customer_id, %item_id, quantity, "quantity update rejected");
        return Err(CartError::Validation(report.errors));
    }

    let updated = tx.set_quantity(item_id, quantity).await?;
    tx.commit().await?;
    Ok(Some(updated))
}

#[instrument(skip(db))]
pub async fn remove_item_from_cart(
    db: &dyn CartDb,
    customer_id: Uuid,
    item_id: Uuid,
) -> Result<(), CartError> {
    let mut tx = db.begin().await?;
    let owned = tx
        .cart_item(item_id)
        .await?
        .is_some_and(|i| i.customer_id == customer_id);
    if !owned || !tx.delete_item(item_id).await? {
        return Err(CartError::ItemNotFound(item_id));
    }
    tx.commit().await?;
    Ok(())
}

/// Reject non-positive quantities and fold repeated products into one line,
/// keeping first-seen order.
fn normalize_sync_items(items: Vec<StockCheckItem>) -> Result<Vec<StockCheckItem>, CartError> {
    let mut out: Vec<StockCheckItem> = Vec::with_capacity(items.len());
    for item in items {
        if item.quantity < 1 {
            return Err(CartError::InvalidQuantity(item.quantity));
        }
        match out.iter_mut().find(|o| o.product_id == item.product_id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(item.quantity),
            None => out.push(item),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod cart_service_tests {
    use super::*;
    use crate::cart::memory::MemoryCartDb;
    use crate::catalog::CatalogProduct;
    use crate::stock::StockIssueKind;

    fn product(sku: &str, price_cents: i64, stock: i32) -> CatalogProduct {
        CatalogProduct {
            id: Uuid::new_v4(),
            sku: sku.into(),
            name: format!("Radiator {sku}"),
            price_cents,
            stock_quantity: stock,
            is_active: true,
            image_url: Some(format!("https://cdn.example/{sku}.jpg")),
        }
    }

    #[tokio::test]
    async fn add_beyond_stock_aborts_without_writing() {
        let p2 = product("P2", 5_000, 4);
        let db = MemoryCartDb::with_products([p2.clone()]);
        let customer = Uuid::new_v4();

        let err = add_item_to_cart(&db, customer, p2.id, 5).await.unwrap_err();
        match err {
            CartError::Validation(issues) => {
                assert_eq!(issues.len(), 1);
                assert_eq!(issues[0].kind, StockIssueKind::InsufficientStock);
                assert_eq!(issues[0].available_stock, 4);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(db.items_for(customer).is_empty());
        // the lazily created customer row rolled back with everything else
        assert!(!db.has_customer(customer));
    }

    #[tokio::test]
    async fn add_accumulates_existing_quantity() {
        let p = product("P1", 2_500, 5);
        let db = MemoryCartDb::with_products([p.clone()]);
        let customer = Uuid::new_v4();

        add_item_to_cart(&db, customer, p.id, 2).await.unwrap();
        let item = add_item_to_cart(&db, customer, p.id, 3).await.unwrap();
        assert_eq!(item.quantity, 5);

        let err = add_item_to_cart(&db, customer, p.id, 1).await.unwrap_err();
        assert!(matches!(err, CartError::Validation(_)));
        assert_eq!(db.items_for(customer)[0].quantity, 5);
    }

    #[tokio::test]
    async fn add_rejects_unknown_and_inactive_products() {
        let mut retired = product("OLD", 1_000, 10);
        retired.is_active = false;
        let db = MemoryCartDb::with_products([retired.clone()]);
        let customer = Uuid::new_v4();

        let err = add_item_to_cart(&db, customer, Uuid::new_v4(), 1).await.unwrap_err();
        let CartError::Validation(issues) = err else { panic!("expected validation error") };
        assert_eq!(issues[0].kind, StockIssueKind::NotFound);

        let err = add_item_to_cart(&db, customer, retired.id, 1).await.unwrap_err();
        let CartError::Validation(issues) = err else { panic!("expected validation error") };
        assert_eq!(issues[0].kind, StockIssueKind::Unavailable);

        assert!(matches!(
            add_item_to_cart(&db, customer, retired.id, 0).await,
            Err(CartError::InvalidQuantity(0))
        ));
    }

    #[tokio::test]
    async fn sync_is_replace_all_and_idempotent() {
        let a = product("A", 1_000, 10);
        let b = product("B", 3_000, 10);
        let c = product("C", 500, 10);
        let db = MemoryCartDb::with_products([a.clone(), b.clone(), c.clone()]);
        let customer = Uuid::new_v4();

        add_item_to_cart(&db, customer, c.id, 1).await.unwrap();

        let items = vec![StockCheckItem::new(a.id, 2), StockCheckItem::new(b.id, 1)];
        let first = sync_user_cart(&db, customer, items.clone()).await.unwrap();
        let rows_once: Vec<_> = db
            .items_for(customer)
            .into_iter()
            .map(|i| (i.product_id, i.quantity))
            .collect();

        let second = sync_user_cart(&db, customer, items).await.unwrap();
        let rows_twice: Vec<_> = db
            .items_for(customer)
            .into_iter()
            .map(|i| (i.product_id, i.quantity))
            .collect();

        assert_eq!(rows_once, vec![(a.id, 2), (b.id, 1)]);
        assert_eq!(rows_once, rows_twice);
        assert_eq!(first.total_cents, 5_000);
        assert_eq!(first.item_count, 3);
        assert_eq!(second.total_cents, first.total_cents);
    }

    #[tokio::test]
    async fn sync_failure_leaves_previous_cart_intact() {
        let a = product("A", 1_000, 10);
        let b = product("B", 1_000, 1);
        let db = MemoryCartDb::with_products([a.clone(), b.clone()]);
        let customer = Uuid::new_v4();

        sync_user_cart(&db, customer, vec![StockCheckItem::new(a.id, 3)])
            .await
            .unwrap();

        let err = sync_user_cart(
            &db,
            customer,
            vec![
                StockCheckItem::new(a.id, 1),
                StockCheckItem::new(b.id, 2),
                StockCheckItem::new(Uuid::new_v4(), 1),
            ],
        )
        .await
        .unwrap_err();

        let CartError::Validation(issues) = err else { panic!("expected validation error") };
        assert_eq!(issues.len(), 2);
        let rows = db.items_for(customer);
        assert_eq!(rows.len(), 1);
        assert_eq!((rows[0].product_id, rows[0].quantity), (a.id, 3));
    }

    #[tokio::test]
    async fn sync_folds_duplicates_and_rejects_non_positive() {
        let a = product("A", 1_000, 10);
        let db = MemoryCartDb::with_products([a.clone()]);
        let customer = Uuid::new_v4();

        let view = sync_user_cart(
            &db,
            customer,
            vec![StockCheckItem::new(a.id, 2), StockCheckItem::new(a.id, 3)],
        )
        .await
        .unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].quantity, 5);

        assert!(matches!(
            sync_user_cart(&db, customer, vec![StockCheckItem::new(a.id, 0)]).await,
            Err(CartError::InvalidQuantity(0))
        ));
    }

    #[tokio::test]
    async fn empty_sync_clears_cart() {
        let a = product("A", 1_000, 10);
        let db = MemoryCartDb::with_products([a.clone()]);
        let customer = Uuid::new_v4();
        add_item_to_cart(&db, customer, a.id, 2).await.unwrap();

        let view = sync_user_cart(&db, customer, Vec::new()).await.unwrap();
        assert!(view.items.is_empty());
        assert!(db.items_for(customer).is_empty());
    }

    #[tokio::test]
    async fn get_cart_uses_current_prices() {
        let mut a = product("A", 1_000, 10);
        let db = MemoryCartDb::with_products([a.clone()]);
        let customer = Uuid::new_v4();
        add_item_to_cart(&db, customer, a.id, 3).await.unwrap();

        a.price_cents = 1_200;
        db.upsert_product(a.clone());

        let view = get_user_cart(&db, customer).await.unwrap();
        assert_eq!(view.total_cents, 3_600);
        assert_eq!(view.item_count, 3);
        assert_eq!(view.items[0].image_url.as_deref(), Some("https://cdn.example/A.jpg"));
    }

    #[tokio::test]
    async fn update_rechecks_stock_and_ownership() {
        let a = product("A", 1_000, 4);
        let db = MemoryCartDb::with_products([a.clone()]);
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let item = add_item_to_cart(&db, owner, a.id, 1).await.unwrap();

        assert!(matches!(
            update_cart_item_quantity(&db, stranger, item.id, 2).await,
            Err(CartError::ItemNotFound(_))
        ));

        let updated = update_cart_item_quantity(&db, owner, item.id, 4).await.unwrap();
        assert_eq!(updated.map(|i| i.quantity), Some(4));

        db.set_stock(a.id, 2);
        let err = update_cart_item_quantity(&db, owner, item.id, 3).await.unwrap_err();
        let CartError::Validation(issues) = err else { panic!("expected validation error") };
        assert_eq!(issues[0].available_stock, 2);
        assert_eq!(db.items_for(owner)[0].quantity, 4);

        assert!(update_cart_item_quantity(&db, owner, item.id, 0).await.unwrap().is_none());
        assert!(db.items_for(owner).is_empty());
    }

    #[tokio::test]
    async fn remove_is_ownership_checked() {
        let a = product("A", 1_000, 4);
        let db = MemoryCartDb::with_products([a.clone()]);
        let owner = Uuid::new_v4();
        let item = add_item_to_cart(&db, owner, a.id, 1).await.unwrap();

        assert!(matches!(
            remove_item_from_cart(&db, Uuid::new_v4(), item.id).await,
            Err(CartError::ItemNotFound(_))
        ));
        assert_eq!(db.items_for(owner).len(), 1);

        remove_item_from_cart(&db, owner, item.id).await.unwrap();
        assert!(db.items_for(owner).is_empty());
        assert!(matches!(
            remove_item_from_cart(&db, owner, item.id).await,
            Err(CartError::ItemNotFound(_))
        ));
    }
}
