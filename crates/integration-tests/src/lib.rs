//! Integration tests for GTM Shop.
//!
//! # Running Tests
//!
//! ```bash
//! # Offline scenarios (in-memory backend, temp directories)
//! cargo test -p gtm-shop-integration-tests
//!
//! # Live backend tests (needs GTM_SUPABASE_URL and GTM_SUPABASE_ANON_KEY)
//! cargo test -p gtm-shop-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `cart_lifecycle` - Cart store scenarios against memory and file storage
//! - `checkout_flow` - Sign-up, profile, and checkout against in-memory collaborators
//! - `live_backend` - Hosted backend round trips (ignored by default)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use gtm_shop_core::{CurrencyCode, Product, ProductId};
use gtm_shop_storefront::catalog::Catalog;
use gtm_shop_storefront::db::{MemoryStore, ProfileCache};
use gtm_shop_storefront::services::{MemoryIdentity, RecordingGateway};
use gtm_shop_storefront::state::{AppState, Backend};
use gtm_shop_storefront::storage::KeyValueStorage;

/// A minimal product for cart scenarios.
#[must_use]
pub fn product(id: &str, price: f64) -> Product {
    Product {
        id: ProductId::new(id),
        name: format!("Product {id}"),
        description: format!("Test product {id}"),
        price,
        category: "Test".to_string(),
        image: format!("https://example.com/{id}.png"),
        rating: None,
        reviews: None,
        in_stock: Some(true),
    }
}

/// Whether two totals are equal to within floating-point noise.
#[must_use]
pub fn same_amount(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

/// An application state wired to in-memory collaborators.
pub struct TestContext {
    pub state: AppState,
    pub store: MemoryStore,
    pub identity: MemoryIdentity,
    pub gateway: RecordingGateway,
}

impl TestContext {
    /// Build a context over `storage` with the bundled catalog.
    ///
    /// # Panics
    ///
    /// Panics if the bundled catalog is invalid.
    #[allow(clippy::expect_used)]
    pub async fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        let store = MemoryStore::new();
        let identity = MemoryIdentity::new();
        let gateway = RecordingGateway::new();

        let state = AppState::with_backend(
            storage,
            Catalog::bundled().expect("bundled catalog is valid"),
            CurrencyCode::USD,
            Backend {
                store: Arc::new(store.clone()),
                identity: Arc::new(identity.clone()),
                gateway: Arc::new(gateway.clone()),
                profiles: ProfileCache::new(),
            },
        )
        .await;

        Self {
            state,
            store,
            identity,
            gateway,
        }
    }
}
