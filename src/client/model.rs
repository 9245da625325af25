use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cart::CartLine;
use crate::catalog::CatalogProduct;
use crate::stock::StockCheckItem;

/// One product line in the local cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    /// Price when the line was added; the server prices from the catalog.
    pub unit_price_cents: i64,
    pub quantity: u32,
    #[serde(default)]
    pub image_url: Option<String>,
    pub sku: String,
    /// Last known stock ceiling. May be stale.
    pub max_stock: u32,
}

impl CartLineItem {
    /// Build a local line from a server row, clamping to the server's current
    /// stock. Returns `None` when nothing can be held.
    pub fn from_server_line(line: &CartLine, id: Uuid) -> Option<Self> {
        let max_stock = if line.is_active {
            clamp_stock(line.stock_quantity)
        } else {
            0
        };
        let quantity = clamp_stock(line.quantity).min(max_stock);
        (quantity > 0).then(|| Self {
            id,
            product_id: line.product_id,
            name: line.name.clone(),
            unit_price_cents: line.price_cents,
            quantity,
            image_url: line.image_url.clone(),
            sku: line.sku.clone(),
            max_stock,
        })
    }

    pub fn subtotal_cents(&self) -> i64 {
        self.unit_price_cents * i64::from(self.quantity)
    }
}

/// What the UI knows about a product when the customer clicks "add".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLineItem {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price_cents: i64,
    pub image_url: Option<String>,
    pub sku: String,
    pub max_stock: u32,
}

impl From<&CatalogProduct> for NewLineItem {
    fn from(p: &CatalogProduct) -> Self {
        Self {
            product_id: p.id,
            name: p.name.clone(),
            unit_price_cents: p.price_cents,
            image_url: p.image_url.clone(),
            sku: p.sku.clone(),
            max_stock: if p.is_active { clamp_stock(p.stock_quantity) } else { 0 },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub total_cents: i64,
    pub item_count: u64,
}

/// Ordered line items, at most one per product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartLineItem>,
}

impl Cart {
    /// Build a cart from stored lines, dropping anything that breaks the
    /// one-line-per-product or quantity invariants.
    pub fn from_items(items: Vec<CartLineItem>) -> Self {
        let mut cart = Cart::default();
        for mut item in items {
            if item.quantity == 0 || cart.find_by_product(item.product_id).is_some() {
                continue;
            }
            item.quantity = item.quantity.min(item.max_stock);
            if item.quantity > 0 {
                cart.items.push(item);
            }
        }
        cart
    }

    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    pub(crate) fn items_mut(&mut self) -> &mut Vec<CartLineItem> {
        &mut self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn find(&self, id: Uuid) -> Option<&CartLineItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn find_by_product(&self, product_id: Uuid) -> Option<&CartLineItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Recomputed on every call.
    pub fn totals(&self) -> CartTotals {
        self.items.iter().fold(CartTotals::default(), |acc, i| CartTotals {
            total_cents: acc.total_cents + i.subtotal_cents(),
            item_count: acc.item_count + u64::from(i.quantity),
        })
    }

    /// The `{productId, quantity}` pairs pushed to `/cart/sync`.
    pub fn sync_items(&self) -> Vec<StockCheckItem> {
        self.items
            .iter()
            .map(|i| StockCheckItem::new(i.product_id, i32::try_from(i.quantity).unwrap_or(i32::MAX)))
            .collect()
    }
}

/// Soft, non-blocking warning surfaced to the UI after a clamped mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartNotice {
    InsufficientStock {
        product_id: Uuid,
        requested: u64,
        max_stock: u32,
    },
}

impl fmt::Display for CartNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CartNotice::InsufficientStock { max_stock, .. } => {
                write!(f, "insufficient stock (only {max_stock} available)")
            }
        }
    }
}

pub(crate) fn clamp_stock(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}
