use tracing::{debug, warn};
use uuid::Uuid;

use super::model::{Cart, CartLineItem, CartNotice, CartTotals, NewLineItem};
use super::repository::CartRepository;

/// Everything that can happen to a local cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    Add { item: NewLineItem, quantity: u32 },
    Remove { id: Uuid },
    UpdateQuantity { id: Uuid, quantity: i64 },
    Clear,
    /// Swap in a reconciled line list (merge on login).
    ReplaceAll(Vec<CartLineItem>),
    /// Fresh authoritative stock for one product.
    ApplyStock { product_id: Uuid, max_stock: u32 },
}

impl CartAction {
    /// Customer-initiated actions own the soft error slot.
    fn is_user_action(&self) -> bool {
        matches!(
            self,
            CartAction::Add { .. }
                | CartAction::Remove { .. }
                | CartAction::UpdateQuantity { .. }
                | CartAction::Clear
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub cart: Cart,
    pub notice: Option<CartNotice>,
    pub changed: bool,
}

/// Apply `action` to `cart` without side effects.
pub fn transition(cart: &Cart, action: CartAction) -> Transition {
    let mut next = cart.clone();
    let mut notice = None;

    match action {
        CartAction::Add { item, quantity } => {
            if quantity > 0 {
                notice = add_line(&mut next, item, quantity);
            }
        }
        CartAction::Remove { id } => {
            next.items_mut().retain(|i| i.id != id);
        }
        CartAction::UpdateQuantity { id, quantity } => {
            if quantity <= 0 {
                next.items_mut().retain(|i| i.id != id);
            } else if let Some(line) = next.items_mut().iter_mut().find(|i| i.id == id) {
                let requested = quantity as u64;
                if requested > u64::from(line.max_stock) {
                    notice = Some(CartNotice::InsufficientStock {
                        product_id: line.product_id,
                        requested,
                        max_stock: line.max_stock,
                    });
                }
                line.quantity = requested.min(u64::from(line.max_stock)) as u32;
                next.items_mut().retain(|i| i.quantity > 0);
            }
        }
        CartAction::Clear => {
            next.items_mut().clear();
        }
        CartAction::ReplaceAll(items) => {
            next = Cart::from_items(items);
        }
        CartAction::ApplyStock { product_id, max_stock } => {
            if let Some(line) = next
                .items_mut()
                .iter_mut()
                .find(|i| i.product_id == product_id)
            {
                line.max_stock = max_stock;
                line.quantity = line.quantity.min(max_stock);
            }
            next.items_mut().retain(|i| i.quantity > 0);
        }
    }

    let changed = next != *cart;
    Transition {
        cart: next,
        notice,
        changed,
    }
}

fn add_line(cart: &mut Cart, item: NewLineItem, quantity: u32) -> Option<CartNotice> {
    let existing = cart
        .items()
        .iter()
        .find(|i| i.product_id == item.product_id)
        .map(|i| u64::from(i.quantity))
        .unwrap_or(0);
    let requested = existing + u64::from(quantity);
    let ceiling = u64::from(item.max_stock);
    let clamped = requested.min(ceiling) as u32;

    let notice = (requested > ceiling).then(|| CartNotice::InsufficientStock {
        product_id: item.product_id,
        requested,
        max_stock: item.max_stock,
    });

    let items = cart.items_mut();
    match items.iter_mut().find(|i| i.product_id == item.product_id) {
        Some(line) => {
            line.quantity = clamped;
            line.max_stock = item.max_stock;
        }
        None if clamped > 0 => items.push(CartLineItem {
            id: Uuid::new_v4(),
            product_id: item.product_id,
            name: item.name,
            unit_price_cents: item.unit_price_cents,
            quantity: clamped,
            image_url: item.image_url,
            sku: item.sku,
            max_stock: item.max_stock,
        }),
        None => {}
    }
    items.retain(|i| i.quantity > 0);
    notice
}

/// The customer's local cart: in-memory state plus a durable copy.
///
/// Mutations never fail. A clamped mutation records a soft
/// [`CartNotice`]; a failed save is logged and kept in `persist_error`
/// while the in-memory cart stays authoritative.
pub struct CartStore {
    cart: Cart,
    repo: Box<dyn CartRepository>,
    error: Option<CartNotice>,
    persist_error: Option<String>,
}

impl CartStore {
    pub fn new(repo: Box<dyn CartRepository>) -> Self {
        let cart = match repo.load() {
            Ok(items) => Cart::from_items(items),
            Err(e) => {
                warn!(error = %e, "could not load stored cart; starting empty");
                Cart::default()
            }
        };
        debug!(lines = cart.items().len(), "cart store ready");
        Self {
            cart,
            repo,
            error: None,
            persist_error: None,
        }
    }

    /// Apply an action, persist, and report whether the cart changed.
    pub fn dispatch(&mut self, action: CartAction) -> bool {
        let user_action = action.is_user_action();
        let Transition {
            cart,
            notice,
            changed,
        } = transition(&self.cart, action);

        self.cart = cart;
        if user_action {
            if let Some(n) = &notice {
                debug!(notice = %n, "cart mutation clamped");
            }
            self.error = notice;
        }
        self.persist();
        changed
    }

    fn persist(&mut self) {
        match self.repo.save(&self.cart) {
            Ok(()) => self.persist_error = None,
            Err(e) => {
                warn!(error = %e, "failed to persist cart; keeping in-memory state");
                self.persist_error = Some(e.to_string());
            }
        }
    }

    pub fn add_item(&mut self, item: NewLineItem, quantity: u32) -> bool {
        self.dispatch(CartAction::Add { item, quantity })
    }

    pub fn add_one(&mut self, item: NewLineItem) -> bool {
        self.add_item(item, 1)
    }

    pub fn remove_item(&mut self, id: Uuid) -> bool {
        self.dispatch(CartAction::Remove { id })
    }

    pub fn update_quantity(&mut self, id: Uuid, quantity: i64) -> bool {
        self.dispatch(CartAction::UpdateQuantity { id, quantity })
    }

    pub fn clear_cart(&mut self) -> bool {
        self.dispatch(CartAction::Clear)
    }

    pub fn totals(&self) -> CartTotals {
        self.cart.totals()
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn items(&self) -> &[CartLineItem] {
        self.cart.items()
    }

    pub fn error(&self) -> Option<&CartNotice> {
        self.error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn persist_error(&self) -> Option<&str> {
        self.persist_error.as_deref()
    }
}
