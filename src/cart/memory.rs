use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{CartItem, CartLine};
use super::store::{CartDb, CartTx};
use crate::catalog::{Catalog, CatalogProduct};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    products: HashMap<Uuid, CatalogProduct>,
    customers: HashSet<Uuid>,
    items: Vec<CartItem>,
}

/// Cart database held in process memory, used by tests and local demos.
///
/// A transaction works on a snapshot taken at `begin`. On commit it replaces
/// the rows of the customers it wrote to and leaves everyone else's alone, so
/// two writers for the same customer race like the unlocked Postgres path
/// (last commit wins) while different customers never interfere.
#[derive(Clone, Default)]
pub struct MemoryCartDb {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryCartDb {
    pub fn with_products(products: impl IntoIterator<Item = CatalogProduct>) -> Self {
        let db = Self::default();
        for p in products {
            db.upsert_product(p);
        }
        db
    }

    pub fn upsert_product(&self, product: CatalogProduct) {
        self.state.lock().products.insert(product.id, product);
    }

    pub fn set_stock(&self, product_id: Uuid, stock_quantity: i32) {
        if let Some(p) = self.state.lock().products.get_mut(&product_id) {
            p.stock_quantity = stock_quantity;
        }
    }

    /// Committed rows for one customer, in insertion order.
    pub fn items_for(&self, customer_id: Uuid) -> Vec<CartItem> {
        self.state
            .lock()
            .items
            .iter()
            .filter(|i| i.customer_id == customer_id)
            .cloned()
            .collect()
    }

    pub fn has_customer(&self, customer_id: Uuid) -> bool {
        self.state.lock().customers.contains(&customer_id)
    }
}

#[async_trait]
impl CartDb for MemoryCartDb {
    async fn begin(&self) -> anyhow::Result<Box<dyn CartTx>> {
        let working = self.state.lock().clone();
        Ok(Box::new(MemoryTx {
            shared: self.state.clone(),
            working,
            touched: HashSet::new(),
        }))
    }
}

#[async_trait]
impl Catalog for MemoryCartDb {
    async fn get_product(&self, product_id: Uuid) -> anyhow::Result<Option<CatalogProduct>> {
        Ok(self.state.lock().products.get(&product_id).cloned())
    }
}

struct MemoryTx {
    shared: Arc<Mutex<MemoryState>>,
    working: MemoryState,
    /// Customers whose rows this transaction wrote.
    touched: HashSet<Uuid>,
}

impl MemoryTx {
    fn position(&self, item_id: Uuid) -> Option<usize> {
        self.working.items.iter().position(|i| i.id == item_id)
    }
}

#[async_trait]
impl CartTx for MemoryTx {
    async fn product(&mut self, product_id: Uuid) -> anyhow::Result<Option<CatalogProduct>> {
        Ok(self.working.products.get(&product_id).cloned())
    }

    async fn ensure_customer(&mut self, customer_id: Uuid) -> anyhow::Result<()> {
        self.working.customers.insert(customer_id);
        self.touched.insert(customer_id);
        Ok(())
    }

    async fn cart_lines(&mut self, customer_id: Uuid) -> anyhow::Result<Vec<CartLine>> {
        let lines = self
            .working
            .items
            .iter()
            .filter(|i| i.customer_id == customer_id)
            .filter_map(|i| {
                let p = self.working.products.get(&i.product_id)?;
                Some(CartLine {
                    id: i.id,
                    product_id: i.product_id,
                    quantity: i.quantity,
                    name: p.name.clone(),
                    sku: p.sku.clone(),
                    price_cents: p.price_cents,
                    stock_quantity: p.stock_quantity,
                    is_active: p.is_active,
                    image_url: p.image_url.clone(),
                })
            })
            .collect();
        Ok(lines)
    }

    async fn cart_item(&mut self, item_id: Uuid) -> anyhow::Result<Option<CartItem>> {
        Ok(self.working.items.iter().find(|i| i.id == item_id).cloned())
    }

    async fn cart_item_for_product(
        &mut self,
        customer_id: Uuid,
        product_id: Uuid,
    ) -> anyhow::Result<Option<CartItem>> {
        Ok(self
            .working
            .items
            .iter()
            .find(|i| i.customer_id == customer_id && i.product_id == product_id)
            .cloned())
    }

    async fn upsert_item(
        &mut self,
        customer_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> anyhow::Result<CartItem> {
        anyhow::ensure!(
            self.working.customers.contains(&customer_id),
            "customer {customer_id} does not exist"
        );
        anyhow::ensure!(
            self.working.products.contains_key(&product_id),
            "product {product_id} does not exist"
        );
        self.touched.insert(customer_id);
        let now = OffsetDateTime::now_utc();
        if let Some(existing) = self
            .working
            .items
            .iter_mut()
            .find(|i| i.customer_id == customer_id && i.product_id == product_id)
        {
            existing.quantity = quantity;
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let item = CartItem {
            id: Uuid::new_v4(),
            customer_id,
            product_id,
            quantity,
            added_at: now,
            updated_at: now,
        };
        self.working.items.push(item.clone());
        Ok(item)
    }

    async fn set_quantity(&mut self, item_id: Uuid, quantity: i32) -> anyhow::Result<CartItem> {
        let idx = self
            .position(item_id)
            .ok_or_else(|| anyhow::anyhow!("cart item {item_id} does not exist"))?;
        let item = &mut self.working.items[idx];
        self.touched.insert(item.customer_id);
        item.quantity = quantity;
        item.updated_at = OffsetDateTime::now_utc();
        Ok(item.clone())
    }

    async fn delete_item(&mut self, item_id: Uuid) -> anyhow::Result<bool> {
        match self.position(item_id) {
            Some(idx) => {
                let item = self.working.items.remove(idx);
                self.touched.insert(item.customer_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_all(&mut self, customer_id: Uuid) -> anyhow::Result<u64> {
        self.touched.insert(customer_id);
        let before = self.working.items.len();
        self.working.items.retain(|i| i.customer_id != customer_id);
        Ok((before - self.working.items.len()) as u64)
    }

    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        let MemoryTx {
            shared,
            working,
            touched,
        } = *self;
        // Products belong to the catalog; only cart-owned rows are published.
        let mut state = shared.lock();
        for customer_id in &touched {
            if working.customers.contains(customer_id) {
                state.customers.insert(*customer_id);
            } else {
                state.customers.remove(customer_id);
            }
        }
        state.items.retain(|i| !touched.contains(&i.customer_id));
        state.items.extend(
            working
                .items
                .into_iter()
                .filter(|i| touched.contains(&i.customer_id)),
        );
        Ok(())
    }
}
