//! Cart store: in-memory cart state mirrored into local storage.
//!
//! # Model
//!
//! The cart is an insertion-ordered list of [`CartLine`]s with at most one
//! line per product id. The in-memory list is the source of truth. After every
//! mutation the full list is handed to a background writer that overwrites a
//! single storage slot (or deletes it when the cart is empty).
//!
//! # Rehydration
//!
//! [`CartStore::open`] reads the slot once and only returns after the read has
//! resolved. No handle exists before that point, so a mutation can never be
//! overwritten by a late rehydration read.
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn demo(product: gtm_shop_core::Product) {
//! use std::sync::Arc;
//! use gtm_shop_storefront::cart::CartStore;
//! use gtm_shop_storefront::storage::FileStorage;
//!
//! let cart = CartStore::open(Arc::new(FileStorage::new(".gtm"))).await;
//! cart.add_to_cart(product, 2);
//! println!("{} items, total {:.2}", cart.cart_item_count(), cart.cart_total());
//! cart.flushed().await;
//! # }
//! ```

mod persist;
pub mod snapshot;

pub use persist::{FlushOutcome, FlushReport};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gtm_shop_core::{CartLine, Product, ProductId};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::storage::{CART_STORAGE_KEY, KeyValueStorage};
use persist::Snapshot;

/// How the store's initial state was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rehydration {
    /// The slot held a valid cart with this many lines.
    Restored(usize),
    /// The slot was absent.
    Empty,
    /// The slot held malformed or invalid data; it was discarded.
    Corrupt(String),
    /// The slot could not be read; it was left untouched.
    ReadFailed(String),
}

/// Shared handle to the cart.
///
/// Cheap to clone; all clones observe and mutate the same cart. Construct one
/// per process with [`CartStore::open`] and pass it to whatever needs it.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    state: Mutex<CartState>,
    writer: mpsc::UnboundedSender<Snapshot>,
    reports: watch::Receiver<FlushReport>,
    rehydration: Rehydration,
}

#[derive(Default)]
struct CartState {
    lines: Vec<CartLine>,
    generation: u64,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("CartStore")
            .field("lines", &state.lines.len())
            .field("generation", &state.generation)
            .field("rehydration", &self.inner.rehydration)
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Open the cart stored under the default slot.
    ///
    /// Must be called from within a Tokio runtime; the background writer is
    /// spawned on it.
    pub async fn open(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self::open_with_key(storage, CART_STORAGE_KEY).await
    }

    /// Open the cart stored under `key`.
    ///
    /// Rehydration never fails: an absent, unreadable, or corrupt slot yields
    /// an empty cart. A corrupt slot is purged by an immediate flush.
    pub async fn open_with_key(storage: Arc<dyn KeyValueStorage>, key: &str) -> Self {
        let (lines, rehydration) = match storage.get(key).await {
            Ok(Some(raw)) => match snapshot::decode(&raw) {
                Ok(lines) => {
                    info!(lines = lines.len(), "Cart loaded from storage");
                    let count = lines.len();
                    (lines, Rehydration::Restored(count))
                }
                Err(e) => {
                    warn!(error = %e, "Discarding unreadable cart from storage");
                    (Vec::new(), Rehydration::Corrupt(e.to_string()))
                }
            },
            Ok(None) => (Vec::new(), Rehydration::Empty),
            Err(e) => {
                warn!(error = %e, "Error loading cart, starting empty");
                (Vec::new(), Rehydration::ReadFailed(e.to_string()))
            }
        };

        let (writer, queue) = mpsc::unbounded_channel();
        let (report_tx, reports) = watch::channel(FlushReport::initial());
        persist::spawn_writer(storage, key.to_owned(), queue, report_tx);

        let purge = matches!(rehydration, Rehydration::Corrupt(_));
        let store = Self {
            inner: Arc::new(CartStoreInner {
                state: Mutex::new(CartState {
                    lines,
                    generation: 0,
                }),
                writer,
                reports,
                rehydration,
            }),
        };

        if purge {
            store.mutate(|_| {});
        }

        store
    }

    fn state(&self) -> MutexGuard<'_, CartState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` to the lines, bump the generation, and queue a flush.
    ///
    /// The snapshot is queued while the lock is held so queue order always
    /// matches generation order.
    fn mutate(&self, f: impl FnOnce(&mut Vec<CartLine>)) {
        let mut state = self.state();
        f(&mut state.lines);
        state.generation += 1;

        let snapshot = Snapshot {
            generation: state.generation,
            lines: state.lines.clone(),
        };
        if self.inner.writer.send(snapshot).is_err() {
            warn!("Cart writer is gone; change kept in memory only");
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` units of `product`.
    ///
    /// If the product is already in the cart its quantity is increased and the
    /// line keeps its position and the product it was first added with;
    /// otherwise a new line is appended. A quantity of zero adds nothing.
    pub fn add_to_cart(&self, product: Product, quantity: u32) {
        if quantity == 0 {
            debug!(product_id = %product.id, "Ignoring add with zero quantity");
            return;
        }

        debug!(product_id = %product.id, quantity, "Adding to cart");
        self.mutate(|lines| {
            if let Some(line) = lines.iter_mut().find(|l| l.product.id == product.id) {
                line.quantity = line.quantity.saturating_add(quantity);
            } else {
                lines.push(CartLine::new(product, quantity));
            }
        });
    }

    /// Add a single unit of `product`.
    pub fn add_one(&self, product: Product) {
        self.add_to_cart(product, 1);
    }

    /// Remove the line for `product_id`; no-op if it is not in the cart.
    pub fn remove_from_cart(&self, product_id: &ProductId) {
        debug!(%product_id, "Removing from cart");
        self.mutate(|lines| lines.retain(|l| &l.product.id != product_id));
    }

    /// Set the quantity for `product_id`.
    ///
    /// A quantity of zero or less removes the line. Products not in the cart
    /// are left alone.
    pub fn update_quantity(&self, product_id: &ProductId, quantity: i64) {
        if quantity <= 0 {
            self.remove_from_cart(product_id);
            return;
        }

        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        debug!(%product_id, quantity, "Updating cart quantity");
        self.mutate(|lines| {
            if let Some(line) = lines.iter_mut().find(|l| &l.product.id == product_id) {
                line.quantity = quantity;
            }
        });
    }

    /// Remove every line.
    pub fn clear_cart(&self) {
        debug!("Clearing cart");
        self.mutate(Vec::clear);
    }

    /// Take `paid` lines out of the cart.
    ///
    /// Each paid quantity is subtracted from the matching line and lines that
    /// reach zero are removed. Units added after `paid` was captured stay in
    /// the cart. With an unchanged cart this empties it like [`Self::clear_cart`].
    pub fn remove_lines(&self, paid: &[CartLine]) {
        debug!(lines = paid.len(), "Removing paid lines");
        self.mutate(|lines| {
            for settled in paid {
                let line = lines
                    .iter_mut()
                    .find(|l| l.product.id == settled.product.id);
                if let Some(line) = line {
                    line.quantity = line.quantity.saturating_sub(settled.quantity);
                }
            }
            lines.retain(|l| l.quantity > 0);
        });
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Sum of unit price times quantity over all lines (no rounding).
    #[must_use]
    pub fn cart_total(&self) -> f64 {
        self.state().lines.iter().map(CartLine::line_total).sum()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn cart_item_count(&self) -> u64 {
        self.state()
            .lines
            .iter()
            .map(|l| u64::from(l.quantity))
            .sum()
    }

    /// Copy of the current lines in cart order.
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.state().lines.clone()
    }

    /// Copy of the line for `product_id`, if present.
    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<CartLine> {
        self.state()
            .lines
            .iter()
            .find(|l| &l.product.id == product_id)
            .cloned()
    }

    /// Number of distinct products in the cart.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state().lines.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state().lines.is_empty()
    }

    /// How the initial state was obtained.
    #[must_use]
    pub fn rehydration(&self) -> &Rehydration {
        &self.inner.rehydration
    }

    /// Generation of the latest mutation (0 before any mutation).
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.state().generation
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Subscribe to flush reports.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FlushReport> {
        self.inner.reports.clone()
    }

    /// The most recent flush report.
    #[must_use]
    pub fn last_flush(&self) -> FlushReport {
        self.inner.reports.borrow().clone()
    }

    /// Wait until every mutation made so far has been flushed (or has failed).
    ///
    /// Returns the report of the flush that covered the latest mutation.
    pub async fn flushed(&self) -> FlushReport {
        let target = self.generation();
        let mut reports = self.subscribe();
        let reached = reports
            .wait_for(|report| report.generation >= target)
            .await
            .map(|report| report.clone());
        reached.unwrap_or_else(|_| reports.borrow().clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::storage::MemoryStorage;

    fn product(id: &str, price: f64) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: String::new(),
            price,
            category: "Apparel".to_string(),
            image: format!("{id}.png"),
            rating: None,
            reviews: None,
            in_stock: Some(true),
        }
    }

    fn ids(cart: &CartStore) -> Vec<String> {
        cart.lines()
            .into_iter()
            .map(|l| l.product.id.into_inner())
            .collect()
    }

    async fn open_empty() -> (CartStore, MemoryStorage) {
        let storage = MemoryStorage::new();
        let cart = CartStore::open(Arc::new(storage.clone())).await;
        (cart, storage)
    }

    #[tokio::test]
    async fn test_add_appends_in_insertion_order() {
        let (cart, _) = open_empty().await;
        cart.add_to_cart(product("b", 1.0), 1);
        cart.add_to_cart(product("a", 1.0), 1);
        assert_eq!(ids(&cart), ["b", "a"]);
    }

    #[tokio::test]
    async fn test_add_merges_and_keeps_position() {
        let (cart, _) = open_empty().await;
        cart.add_to_cart(product("a", 2.0), 2);
        cart.add_to_cart(product("b", 1.0), 1);
        cart.add_to_cart(product("a", 2.0), 3);

        assert_eq!(ids(&cart), ["a", "b"]);
        assert_eq!(cart.line(&ProductId::new("a")).unwrap().quantity, 5);
        assert_eq!(cart.len(), 2);
    }

    #[tokio::test]
    async fn test_merge_keeps_first_added_product() {
        let (cart, _) = open_empty().await;
        let mut first = product("a", 10.0);
        first.name = "First".to_string();
        let mut second = product("a", 99.0);
        second.name = "Second".to_string();

        cart.add_to_cart(first.clone(), 1);
        cart.add_to_cart(second, 1);

        let line = cart.line(&ProductId::new("a")).unwrap();
        assert_eq!(line.product, first);
        assert_eq!(line.quantity, 2);
        assert!((cart.cart_total() - 20.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_remove_lines_keeps_later_additions() {
        let (cart, storage) = open_empty().await;
        cart.add_to_cart(product("a", 2.0), 2);
        cart.add_to_cart(product("b", 1.0), 1);
        let paid = cart.lines();

        cart.add_to_cart(product("a", 2.0), 1);
        cart.add_to_cart(product("c", 3.0), 1);
        cart.remove_lines(&paid);

        assert_eq!(ids(&cart), ["a", "c"]);
        assert_eq!(cart.line(&ProductId::new("a")).unwrap().quantity, 1);

        cart.remove_lines(&cart.lines());
        assert!(cart.is_empty());
        cart.flushed().await;
        assert!(!storage.contains(CART_STORAGE_KEY));
    }

    #[tokio::test]
    async fn test_add_zero_quantity_is_ignored() {
        let (cart, _) = open_empty().await;
        cart.add_to_cart(product("a", 2.0), 0);
        assert!(cart.is_empty());
        assert_eq!(cart.generation(), 0);
    }

    #[tokio::test]
    async fn test_add_one_defaults_to_single_unit() {
        let (cart, _) = open_empty().await;
        cart.add_one(product("a", 2.0));
        cart.add_one(product("a", 2.0));
        assert_eq!(cart.cart_item_count(), 2);
    }

    #[tokio::test]
    async fn test_remove_missing_is_noop() {
        let (cart, _) = open_empty().await;
        cart.add_to_cart(product("a", 2.0), 1);
        let before = cart.lines();
        cart.remove_from_cart(&ProductId::new("zzz"));
        assert_eq!(cart.lines(), before);
    }

    #[tokio::test]
    async fn test_update_quantity_is_absolute() {
        let (cart, _) = open_empty().await;
        cart.add_to_cart(product("a", 2.0), 4);
        cart.update_quantity(&ProductId::new("a"), 1);
        assert_eq!(cart.line(&ProductId::new("a")).unwrap().quantity, 1);
    }

    #[tokio::test]
    async fn test_update_non_positive_equals_remove() {
        for quantity in [0, -5] {
            let (updated, _) = open_empty().await;
            let (removed, _) = open_empty().await;
            for cart in [&updated, &removed] {
                cart.add_to_cart(product("a", 1.0), 2);
                cart.add_to_cart(product("b", 3.0), 1);
            }

            updated.update_quantity(&ProductId::new("a"), quantity);
            removed.remove_from_cart(&ProductId::new("a"));

            assert_eq!(updated.lines(), removed.lines());
            assert!(updated.line(&ProductId::new("a")).is_none());
        }
    }

    #[tokio::test]
    async fn test_update_missing_product_is_noop() {
        let (cart, _) = open_empty().await;
        cart.add_to_cart(product("a", 1.0), 2);
        cart.update_quantity(&ProductId::new("b"), 7);
        assert_eq!(ids(&cart), ["a"]);
        assert_eq!(cart.cart_item_count(), 2);
    }

    #[tokio::test]
    async fn test_totals() {
        let (cart, _) = open_empty().await;
        cart.add_to_cart(product("p1", 10.0), 2);
        cart.add_to_cart(product("p2", 5.0), 3);
        assert!((cart.cart_total() - 35.0).abs() < 1e-9);
        assert_eq!(cart.cart_item_count(), 5);
    }

    #[tokio::test]
    async fn test_flush_writes_then_deletes() {
        let (cart, storage) = open_empty().await;
        cart.add_to_cart(product("a", 1.0), 1);
        let report = cart.flushed().await;
        assert_eq!(report.outcome, FlushOutcome::Written);
        assert!(storage.contains(CART_STORAGE_KEY));

        cart.clear_cart();
        let report = cart.flushed().await;
        assert_eq!(report.outcome, FlushOutcome::Deleted);
        assert!(!storage.contains(CART_STORAGE_KEY));
    }

    #[tokio::test]
    async fn test_flush_failure_keeps_memory_state() {
        let (cart, storage) = open_empty().await;
        storage.fail_writes(true);

        cart.add_to_cart(product("a", 1.0), 3);
        let report = cart.flushed().await;

        assert!(matches!(report.outcome, FlushOutcome::Failed(_)));
        assert!(!report.is_ok());
        assert_eq!(cart.cart_item_count(), 3);
    }

    #[tokio::test]
    async fn test_read_failure_starts_empty_and_keeps_slot() {
        let storage = MemoryStorage::new();
        storage.insert(CART_STORAGE_KEY, "[]");
        storage.fail_reads(true);

        let cart = CartStore::open(Arc::new(storage.clone())).await;
        assert!(cart.is_empty());
        assert!(matches!(cart.rehydration(), Rehydration::ReadFailed(_)));
        assert_eq!(cart.generation(), 0);
        assert!(storage.contains(CART_STORAGE_KEY));
    }

    #[tokio::test]
    async fn test_corrupt_slot_is_purged() {
        let storage = MemoryStorage::new();
        storage.insert(CART_STORAGE_KEY, "{definitely not json");

        let cart = CartStore::open(Arc::new(storage.clone())).await;
        assert!(cart.is_empty());
        assert!(matches!(cart.rehydration(), Rehydration::Corrupt(_)));

        cart.flushed().await;
        assert!(!storage.contains(CART_STORAGE_KEY));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let (cart, _) = open_empty().await;
        let other = cart.clone();
        other.add_to_cart(product("a", 1.0), 1);
        assert_eq!(cart.cart_item_count(), 1);
    }

    #[tokio::test]
    async fn test_reopen_restores_lines() {
        let (cart, storage) = open_empty().await;
        cart.add_to_cart(product("a", 9.99), 2);
        cart.add_to_cart(product("b", 5.0), 1);
        cart.flushed().await;

        let reopened = CartStore::open(Arc::new(storage)).await;
        assert_eq!(reopened.rehydration(), &Rehydration::Restored(2));
        assert_eq!(reopened.lines(), cart.lines());
    }

    #[tokio::test]
    async fn test_slow_rehydration_does_not_clobber_first_add() {
        let storage = MemoryStorage::new();
        let seeded = vec![CartLine::new(product("a", 9.99), 1)];
        storage.insert(
            CART_STORAGE_KEY,
            snapshot::encode(&seeded).unwrap().unwrap(),
        );

        let slow = storage.with_latency(Duration::from_millis(50));
        let cart = CartStore::open(Arc::new(slow)).await;
        cart.add_to_cart(product("b", 5.0), 1);
        cart.flushed().await;

        assert_eq!(ids(&cart), ["a", "b"]);
        let persisted = snapshot::decode(&storage.peek(CART_STORAGE_KEY).unwrap()).unwrap();
        assert_eq!(persisted, cart.lines());
    }

    #[tokio::test]
    async fn test_slow_storage_flushes_latest_state() {
        let storage = MemoryStorage::new();
        let slow = storage.with_latency(Duration::from_millis(20));
        let cart = CartStore::open(Arc::new(slow)).await;

        for i in 1..=5 {
            cart.update_quantity(&ProductId::new("a"), i);
            cart.add_to_cart(product(&format!("p{i}"), 1.0), 1);
        }

        let report = cart.flushed().await;
        assert_eq!(report.generation, cart.generation());

        let persisted = snapshot::decode(&storage.peek(CART_STORAGE_KEY).unwrap()).unwrap();
        assert_eq!(persisted, cart.lines());
    }
}
