use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::api::{CartApi, HttpCartApi, Session, SyncError};
use super::merge::merge_on_login;
use super::model::{clamp_stock, NewLineItem};
use super::repository::JsonFileRepository;
use super::retry::{retry_with_backoff, RetryPolicy};
use super::scheduler::PushScheduler;
use super::store::{CartAction, CartStore};
use crate::cart::CartLine;
use crate::config::ClientConfig;
use crate::stock::{StockIssue, StockValidation};

pub type SharedCartStore = Arc<Mutex<CartStore>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEvent {
    Authenticated {
        customer_id: Uuid,
        access_token: String,
    },
    LoggedOut,
}

/// What the UI shows about background sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStatus {
    /// Local changes the server has not acknowledged yet.
    pub dirty: bool,
    pub last_error: Option<String>,
    pub pushes_succeeded: u64,
}

#[derive(Debug, Default)]
struct SyncState {
    session: Option<Session>,
    merged_for: Option<Uuid>,
    /// Bumped on every server-visible local change.
    revision: u64,
    status: SyncStatus,
}

struct Inner {
    store: SharedCartStore,
    api: Arc<dyn CartApi>,
    retry: RetryPolicy,
    window: Duration,
    scheduler: Mutex<PushScheduler>,
    sync: Mutex<SyncState>,
}

struct PushReport {
    result: Result<(), SyncError>,
    /// The local cart was corrected from the server's answer and should be
    /// pushed again.
    repush: bool,
}

impl PushReport {
    fn idle() -> Self {
        Self {
            result: Ok(()),
            repush: false,
        }
    }
}

impl Inner {
    fn current_customer(&self) -> Option<Uuid> {
        self.sync.lock().session.as_ref().map(|s| s.customer_id)
    }

    fn local_changed(self: &Arc<Self>) {
        {
            let mut sync = self.sync.lock();
            if sync.session.is_none() {
                return;
            }
            sync.revision += 1;
            sync.status.dirty = true;
        }
        self.schedule_push();
    }

    fn schedule_push(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let window = self.window;
        self.scheduler
            .lock()
            .schedule(run_scheduled_push(weak, window));
        debug!(?window, "cart push scheduled");
    }

    /// Apply `actions` to the store. True when the `{productId, quantity}`
    /// list the server would see changed.
    fn correct_store(&self, actions: impl IntoIterator<Item = CartAction>) -> bool {
        let mut store = self.store.lock();
        let before = store.cart().sync_items();
        for action in actions {
            store.dispatch(action);
        }
        store.cart().sync_items() != before
    }

    fn apply_server_stock(&self, lines: &[CartLine]) -> bool {
        self.correct_store(lines.iter().map(|l| CartAction::ApplyStock {
            product_id: l.product_id,
            max_stock: if l.is_active {
                clamp_stock(l.stock_quantity)
            } else {
                0
            },
        }))
    }

    fn apply_issues(&self, issues: &[StockIssue]) -> bool {
        self.correct_store(issues.iter().map(|i| CartAction::ApplyStock {
            product_id: i.product_id,
            max_stock: clamp_stock(i.available_stock),
        }))
    }

    async fn push(&self) -> PushReport {
        let (session, revision) = {
            let sync = self.sync.lock();
            match &sync.session {
                Some(s) => (s.clone(), sync.revision),
                None => return PushReport::idle(),
            }
        };
        let items = self.store.lock().cart().sync_items();

        let result = retry_with_backoff(&self.retry, |attempt| {
            let api = self.api.clone();
            let session = session.clone();
            let items = items.clone();
            async move {
                debug!(attempt, items = items.len(), "pushing cart");
                api.sync_cart(&session, &items).await
            }
        })
        .await;

        if self.current_customer() != Some(session.customer_id) {
            debug!("session changed during push; result discarded");
            return PushReport::idle();
        }

        match result {
            Ok(view) => {
                let repush = self.apply_server_stock(&view.items);
                let mut sync = self.sync.lock();
                if repush {
                    sync.revision += 1;
                }
                sync.status.dirty = sync.revision != revision;
                sync.status.last_error = None;
                sync.status.pushes_succeeded += 1;
                info!(
                    customer_id = %session.customer_id,
                    lines = view.items.len(),
                    total_cents = view.total_cents,
                    "cart pushed"
                );
                PushReport {
                    result: Ok(()),
                    repush,
                }
            }
            Err(e) => {
                let repush = self.apply_issues(e.stock_issues());
                let mut sync = self.sync.lock();
                if repush {
                    sync.revision += 1;
                }
                sync.status.dirty = true;
                sync.status.last_error = Some(e.to_string());
                warn!(error = %e, clamped = repush, "cart push failed");
                PushReport {
                    result: Err(e),
                    repush,
                }
            }
        }
    }
}

async fn run_scheduled_push(inner: Weak<Inner>, window: Duration) {
    loop {
        let Some(strong) = inner.upgrade() else {
            return;
        };
        let repush = strong.push().await.repush;
        drop(strong);
        if !repush {
            return;
        }
        tokio::time::sleep(window).await;
    }
}

/// Keeps the local cart and the server cart in step.
///
/// Local mutations apply immediately; while a customer is signed in each
/// server-visible change (re)schedules a debounced replace-all push.
#[derive(Clone)]
pub struct CartSyncCoordinator {
    inner: Arc<Inner>,
}

impl CartSyncCoordinator {
    pub fn new(store: SharedCartStore, api: Arc<dyn CartApi>, config: &ClientConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                api,
                retry: config.retry.clone(),
                window: config.debounce,
                scheduler: Mutex::new(PushScheduler::new(config.debounce)),
                sync: Mutex::new(SyncState::default()),
            }),
        }
    }

    /// File-backed store and HTTP client built from `config`.
    pub fn connect(config: &ClientConfig) -> Result<Self, SyncError> {
        let repo = JsonFileRepository::new(&config.storage_path);
        let store = Arc::new(Mutex::new(CartStore::new(Box::new(repo))));
        let api = Arc::new(HttpCartApi::new(config)?);
        Ok(Self::new(store, api, config))
    }

    pub fn store(&self) -> SharedCartStore {
        self.inner.store.clone()
    }

    fn mutate(&self, f: impl FnOnce(&mut CartStore) -> bool) -> bool {
        let (changed, visible) = {
            let mut store = self.inner.store.lock();
            let before = store.cart().sync_items();
            let changed = f(&mut store);
            (changed, store.cart().sync_items() != before)
        };
        if visible {
            self.inner.local_changed();
        }
        changed
    }

    pub fn add_item(&self, item: NewLineItem, quantity: u32) -> bool {
        self.mutate(|s| s.add_item(item, quantity))
    }

    pub fn remove_item(&self, id: Uuid) -> bool {
        self.mutate(|s| s.remove_item(id))
    }

    pub fn update_quantity(&self, id: Uuid, quantity: i64) -> bool {
        self.mutate(|s| s.update_quantity(id, quantity))
    }

    /// Empty the cart. While signed in the empty cart is pushed after the
    /// window; any older pending push is dropped.
    pub fn clear_cart(&self) -> bool {
        self.inner.scheduler.lock().cancel();
        self.mutate(|s| s.clear_cart())
    }

    /// The server cleared its cart as part of order creation; clear locally
    /// without pushing.
    pub fn order_placed(&self) {
        self.inner.scheduler.lock().cancel();
        self.inner.store.lock().clear_cart();
        let mut sync = self.inner.sync.lock();
        sync.revision += 1;
        sync.status.dirty = false;
        sync.status.last_error = None;
        info!("order placed; local cart cleared");
    }

    #[instrument(skip(self, event))]
    pub async fn handle_identity(&self, event: IdentityEvent) {
        match event {
            IdentityEvent::LoggedOut => {
                self.inner.scheduler.lock().cancel();
                let mut sync = self.inner.sync.lock();
                sync.session = None;
                sync.merged_for = None;
                info!("logged out; cart kept locally");
            }
            IdentityEvent::Authenticated {
                customer_id,
                access_token,
            } => {
                let session = Session {
                    customer_id,
                    access_token,
                };
                let needs_merge = {
                    let mut sync = self.inner.sync.lock();
                    let switched = sync
                        .session
                        .as_ref()
                        .is_some_and(|s| s.customer_id != customer_id);
                    if switched {
                        self.inner.scheduler.lock().cancel();
                    }
                    sync.session = Some(session.clone());
                    sync.merged_for != Some(customer_id)
                };
                if needs_merge {
                    self.merge_with_server(&session).await;
                }
            }
        }
    }

    async fn merge_with_server(&self, session: &Session) {
        let view = match self.inner.api.fetch_cart(session).await {
            Ok(view) => view,
            Err(e) => {
                warn!(error = %e, customer_id = %session.customer_id, "could not fetch server cart");
                let mut sync = self.inner.sync.lock();
                sync.status.dirty = true;
                sync.status.last_error = Some(e.to_string());
                return;
            }
        };

        if self.inner.current_customer() != Some(session.customer_id) {
            return;
        }

        let outcome = {
            let mut store = self.inner.store.lock();
            let outcome = merge_on_login(&view.items, store.items());
            store.dispatch(CartAction::ReplaceAll(outcome.items.clone()));
            outcome
        };
        self.inner.sync.lock().merged_for = Some(session.customer_id);
        info!(
            customer_id = %session.customer_id,
            server_lines = view.items.len(),
            merged_lines = outcome.items.len(),
            needs_push = outcome.needs_push,
            "cart merged on login"
        );
        if outcome.needs_push {
            self.inner.local_changed();
        }
    }

    /// Push now, skipping the debounce window. The push replaces any pending
    /// one and is itself cancelled by a later schedule, `clear_cart`,
    /// `order_placed` or logout, which yields [`SyncError::Superseded`].
    pub async fn push_now(&self) -> Result<(), SyncError> {
        let (tx, rx) = oneshot::channel();
        let weak = Arc::downgrade(&self.inner);
        self.inner
            .scheduler
            .lock()
            .schedule_after(Duration::ZERO, async move {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let report = inner.push().await;
                let _ = tx.send(report.result);
                if report.repush {
                    inner.schedule_push();
                }
            });
        rx.await.unwrap_or(Err(SyncError::Superseded))
    }

    /// Refresh one line's stock ceiling from the catalog, clamping or
    /// dropping the line when stock fell.
    #[instrument(skip(self))]
    pub async fn refresh_item_stock(&self, product_id: Uuid) -> Result<(), SyncError> {
        let product = self.inner.api.product(product_id).await?;
        let max_stock = match &product {
            Some(p) if p.is_active => clamp_stock(p.stock_quantity),
            _ => 0,
        };
        self.mutate(|s| {
            s.dispatch(CartAction::ApplyStock {
                product_id,
                max_stock,
            })
        });
        Ok(())
    }

    /// Advisory stock check of the whole cart before checkout.
    pub async fn precheck_checkout(&self) -> Result<StockValidation, SyncError> {
        let items = self.inner.store.lock().cart().sync_items();
        self.inner.api.validate(&items).await
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.inner.sync.lock().status.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.current_customer().is_some()
    }

    pub fn has_pending_push(&self) -> bool {
        self.inner.scheduler.lock().is_pending()
    }
}

#[cfg(test)]
mod coordinator_tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use crate::cart::dto::CartView;
    use crate::cart::memory::MemoryCartDb;
    use crate::cart::{services, CartError};
    use crate::catalog::{Catalog, CatalogProduct};
    use crate::client::repository::MemoryRepository;
    use crate::stock::{validate_with_catalog, StockCheckItem};

    /// Cart API that runs the real service layer over an in-memory database.
    #[derive(Default)]
    struct FakeApi {
        db: MemoryCartDb,
        pushes: Mutex<Vec<Vec<StockCheckItem>>>,
        failures: Mutex<VecDeque<SyncError>>,
        fail_fetch: AtomicBool,
    }

    impl FakeApi {
        fn pushes(&self) -> Vec<Vec<StockCheckItem>> {
            self.pushes.lock().clone()
        }

        fn fail_next(&self, e: SyncError) {
            self.failures.lock().push_back(e);
        }
    }

    fn to_sync_error(e: CartError) -> SyncError {
        match e {
            CartError::Validation(issues) => SyncError::Rejected {
                status: 400,
                message: "insufficient stock".into(),
                issues,
            },
            other => SyncError::Server {
                status: 500,
                message: other.to_string(),
            },
        }
    }

    #[async_trait]
    impl CartApi for FakeApi {
        async fn fetch_cart(&self, session: &Session) -> Result<CartView, SyncError> {
            if self.fail_fetch.load(Ordering::SeqCst) {
                return Err(SyncError::Transport("connection refused".into()));
            }
            services::get_user_cart(&self.db, session.customer_id)
                .await
                .map_err(to_sync_error)
        }

        async fn sync_cart(
            &self,
            session: &Session,
            items: &[StockCheckItem],
        ) -> Result<CartView, SyncError> {
            self.pushes.lock().push(items.to_vec());
            let injected = self.failures.lock().pop_front();
            if let Some(e) = injected {
                return Err(e);
            }
            services::sync_user_cart(&self.db, session.customer_id, items.to_vec())
                .await
                .map_err(to_sync_error)
        }

        async fn validate(&self, items: &[StockCheckItem]) -> Result<StockValidation, SyncError> {
            validate_with_catalog(&self.db, items)
                .await
                .map_err(|e| SyncError::Server {
                    status: 500,
                    message: e.to_string(),
                })
        }

        async fn product(&self, product_id: Uuid) -> Result<Option<CatalogProduct>, SyncError> {
            self.db
                .get_product(product_id)
                .await
                .map_err(|e| SyncError::Transport(e.to_string()))
        }
    }

    fn product(sku: &str, stock: i32) -> CatalogProduct {
        CatalogProduct {
            id: Uuid::new_v4(),
            sku: sku.into(),
            name: format!("Panel radiator {sku}"),
            price_cents: 12_000,
            stock_quantity: stock,
            is_active: true,
            image_url: None,
        }
    }

    struct Harness {
        coordinator: CartSyncCoordinator,
        api: Arc<FakeApi>,
        repo: MemoryRepository,
        customer: Uuid,
    }

    fn harness(products: Vec<CatalogProduct>) -> Harness {
        let api = Arc::new(FakeApi {
            db: MemoryCartDb::with_products(products),
            ..FakeApi::default()
        });
        let repo = MemoryRepository::default();
        let store = Arc::new(Mutex::new(CartStore::new(Box::new(repo.clone()))));
        let coordinator = CartSyncCoordinator::new(store, api.clone(), &ClientConfig::default());
        Harness {
            coordinator,
            api,
            repo,
            customer: Uuid::new_v4(),
        }
    }

    impl Harness {
        async fn login(&self) {
            self.coordinator
                .handle_identity(IdentityEvent::Authenticated {
                    customer_id: self.customer,
                    access_token: "token".into(),
                })
                .await;
        }

        fn server_rows(&self) -> Vec<(Uuid, i32)> {
            self.api
                .db
                .items_for(self.customer)
                .into_iter()
                .map(|i| (i.product_id, i.quantity))
                .collect()
        }

        fn local_rows(&self) -> Vec<(Uuid, u32)> {
            self.coordinator
                .store()
                .lock()
                .items()
                .iter()
                .map(|i| (i.product_id, i.quantity))
                .collect()
        }
    }

    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_updates_collapse_into_one_push() {
        let p = product("K22", 10);
        let h = harness(vec![p.clone()]);
        h.login().await;

        h.coordinator.add_item(NewLineItem::from(&p), 1);
        let id = h.coordinator.store().lock().items()[0].id;
        assert!(h.coordinator.sync_status().dirty);

        advance(1_000).await;
        h.coordinator.update_quantity(id, 3);
        assert!(h.api.pushes().is_empty());

        advance(3_500).await;
        assert_eq!(h.api.pushes(), vec![vec![StockCheckItem::new(p.id, 3)]]);
        assert_eq!(h.server_rows(), vec![(p.id, 3)]);

        let status = h.coordinator.sync_status();
        assert!(!status.dirty);
        assert_eq!(status.pushes_succeeded, 1);
        assert!(!h.coordinator.has_pending_push());
    }

    #[tokio::test(start_paused = true)]
    async fn guest_mutations_are_not_pushed() {
        let p = product("K11", 10);
        let h = harness(vec![p.clone()]);

        h.coordinator.add_item(NewLineItem::from(&p), 2);
        advance(10_000).await;

        assert!(h.api.pushes().is_empty());
        assert!(!h.coordinator.sync_status().dirty);
        assert_eq!(h.repo.saved().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_supersedes_pending_push() {
        let p = product("K33", 10);
        let h = harness(vec![p.clone()]);
        h.login().await;
        h.coordinator.add_item(NewLineItem::from(&p), 2);
        advance(4_000).await;
        assert_eq!(h.server_rows(), vec![(p.id, 2)]);

        h.coordinator.add_item(NewLineItem::from(&p), 1);
        advance(1_000).await;
        h.coordinator.clear_cart();
        advance(4_000).await;

        let pushes = h.api.pushes();
        assert_eq!(pushes.len(), 2);
        assert!(pushes[1].is_empty());
        assert!(h.server_rows().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn order_placed_cancels_push_and_clears_locally() {
        let p = product("K44", 10);
        let h = harness(vec![p.clone()]);
        h.login().await;
        h.coordinator.add_item(NewLineItem::from(&p), 2);
        assert!(h.coordinator.has_pending_push());

        h.coordinator.order_placed();
        advance(10_000).await;

        assert!(h.api.pushes().is_empty());
        assert!(h.local_rows().is_empty());
        assert!(!h.coordinator.sync_status().dirty);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried() {
        let p = product("K55", 10);
        let h = harness(vec![p.clone()]);
        h.login().await;
        h.api.fail_next(SyncError::Transport("connection reset".into()));
        h.api.fail_next(SyncError::Server {
            status: 503,
            message: "unavailable".into(),
        });

        h.coordinator.add_item(NewLineItem::from(&p), 2);
        advance(3_000 + 500 + 1_000 + 500).await;

        assert_eq!(h.api.pushes().len(), 3);
        assert_eq!(h.server_rows(), vec![(p.id, 2)]);
        let status = h.coordinator.sync_status();
        assert!(!status.dirty);
        assert!(status.last_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn rejection_clamps_local_cart_and_repushes() {
        let p = product("K66", 5);
        let h = harness(vec![p.clone()]);
        h.login().await;

        h.coordinator.add_item(NewLineItem::from(&p), 4);
        h.api.db.set_stock(p.id, 2);

        advance(3_500).await;
        assert_eq!(h.api.pushes().len(), 1);
        assert_eq!(h.local_rows(), vec![(p.id, 2)]);
        let status = h.coordinator.sync_status();
        assert!(status.dirty);
        assert!(status.last_error.is_some());
        assert!(h.server_rows().is_empty());

        advance(3_500).await;
        assert_eq!(h.api.pushes().len(), 2);
        assert_eq!(h.server_rows(), vec![(p.id, 2)]);
        let status = h.coordinator.sync_status();
        assert!(!status.dirty);
        assert!(status.last_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn login_merges_with_server_winning() {
        let a = product("A", 10);
        let b = product("B", 10);
        let h = harness(vec![a.clone(), b.clone()]);
        services::sync_user_cart(&h.api.db, h.customer, vec![StockCheckItem::new(a.id, 5)])
            .await
            .unwrap();

        h.coordinator.add_item(NewLineItem::from(&a), 2);
        h.coordinator.add_item(NewLineItem::from(&b), 1);
        h.login().await;

        assert_eq!(h.local_rows(), vec![(a.id, 5), (b.id, 1)]);
        assert!(h.coordinator.has_pending_push());

        advance(3_500).await;
        assert_eq!(h.server_rows(), vec![(a.id, 5), (b.id, 1)]);

        // a repeated event for the same customer does not merge again
        let first = h.coordinator.store().lock().items()[0].id;
        h.coordinator.update_quantity(first, 1);
        h.login().await;
        assert_eq!(h.local_rows(), vec![(a.id, 1), (b.id, 1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn login_with_matching_carts_does_not_push() {
        let a = product("A", 10);
        let h = harness(vec![a.clone()]);
        services::sync_user_cart(&h.api.db, h.customer, vec![StockCheckItem::new(a.id, 2)])
            .await
            .unwrap();

        h.login().await;
        advance(10_000).await;

        assert_eq!(h.local_rows(), vec![(a.id, 2)]);
        assert!(h.api.pushes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_leaves_local_cart_untouched() {
        let a = product("A", 10);
        let h = harness(vec![a.clone()]);
        h.coordinator.add_item(NewLineItem::from(&a), 2);
        h.api.fail_fetch.store(true, Ordering::SeqCst);

        h.login().await;

        assert_eq!(h.local_rows(), vec![(a.id, 2)]);
        let status = h.coordinator.sync_status();
        assert!(status.dirty);
        assert!(status.last_error.unwrap().contains("connection refused"));

        h.api.fail_fetch.store(false, Ordering::SeqCst);
        h.login().await;
        advance(3_500).await;
        assert_eq!(h.server_rows(), vec![(a.id, 2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn logout_cancels_push_and_keeps_cart() {
        let a = product("A", 10);
        let h = harness(vec![a.clone()]);
        h.login().await;
        h.coordinator.add_item(NewLineItem::from(&a), 2);

        h.coordinator.handle_identity(IdentityEvent::LoggedOut).await;
        advance(10_000).await;

        assert!(h.api.pushes().is_empty());
        assert_eq!(h.local_rows(), vec![(a.id, 2)]);
        assert!(!h.coordinator.is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn stock_refresh_clamps_stale_ceiling() {
        let a = product("A", 5);
        let gone = product("G", 5);
        let h = harness(vec![a.clone()]);
        h.coordinator.add_item(NewLineItem::from(&a), 4);
        h.coordinator.add_item(NewLineItem::from(&gone), 1);

        h.api.db.set_stock(a.id, 1);
        h.coordinator.refresh_item_stock(a.id).await.unwrap();
        h.coordinator.refresh_item_stock(gone.id).await.unwrap();

        let store = h.coordinator.store();
        let store = store.lock();
        assert_eq!(store.items().len(), 1);
        assert_eq!(store.items()[0].quantity, 1);
        assert_eq!(store.items()[0].max_stock, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn precheck_reports_every_failing_line() {
        let a = product("A", 5);
        let b = product("B", 5);
        let h = harness(vec![a.clone(), b.clone()]);
        h.coordinator.add_item(NewLineItem::from(&a), 4);
        h.coordinator.add_item(NewLineItem::from(&b), 3);
        h.api.db.set_stock(a.id, 1);
        h.api.db.set_stock(b.id, 2);

        let report = h.coordinator.precheck_checkout().await.unwrap();
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_push_is_cancelled_by_order_placed() {
        let a = product("A", 10);
        let h = harness(vec![a.clone()]);
        h.login().await;
        h.coordinator.add_item(NewLineItem::from(&a), 2);
        h.api.fail_next(SyncError::Transport("connection reset".into()));
        h.api.fail_next(SyncError::Transport("connection reset".into()));

        let coordinator = h.coordinator.clone();
        let pushing = tokio::spawn(async move { coordinator.push_now().await });
        advance(100).await;
        assert_eq!(h.api.pushes().len(), 1);
        assert!(h.coordinator.has_pending_push());

        h.coordinator.order_placed();
        assert_eq!(pushing.await.unwrap(), Err(SyncError::Superseded));

        advance(10_000).await;
        assert_eq!(h.api.pushes().len(), 1);
        assert!(h.server_rows().is_empty());
        assert!(h.local_rows().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn push_now_skips_the_window() {
        let a = product("A", 10);
        let h = harness(vec![a.clone()]);
        h.login().await;
        h.coordinator.add_item(NewLineItem::from(&a), 2);

        h.coordinator.push_now().await.unwrap();
        assert_eq!(h.server_rows(), vec![(a.id, 2)]);
        assert!(!h.coordinator.has_pending_push());

        advance(10_000).await;
        assert_eq!(h.api.pushes().len(), 1);
    }
}
