//! Application state shared across commands.

use std::sync::Arc;

use gtm_shop_core::CurrencyCode;

use crate::cart::CartStore;
use crate::catalog::Catalog;
use crate::config::{CartConfig, ConfigError, StorefrontConfig};
use crate::db::{ContactRepository, OrderRepository, ProfileCache, RemoteStore};
use crate::error::AppError;
use crate::services::{
    AuthService, CheckoutService, IdentityProvider, PaymentGateway, ProfileService,
};
use crate::storage::{FileStorage, KeyValueStorage};
use crate::supabase::{EdgeFunctionGateway, SupabaseAuth, SupabaseClient, SupabaseRest};

/// Application state.
///
/// This struct is cheaply cloneable via `Arc`. It owns the single cart store
/// and the collaborators services borrow. Backend features are absent when
/// the state was built from [`CartConfig`] alone.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    storage: Arc<dyn KeyValueStorage>,
    catalog: Catalog,
    cart: CartStore,
    currency: CurrencyCode,
    backend: Option<Backend>,
}

/// Hosted backend collaborators.
pub struct Backend {
    pub store: Arc<dyn RemoteStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub profiles: ProfileCache,
}

impl AppState {
    /// Build a cart-only state. Works offline.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Catalog` if a configured catalog file is unreadable.
    pub async fn local(config: &CartConfig) -> Result<Self, AppError> {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(FileStorage::new(&config.data_dir));
        let catalog = Catalog::load_or_bundled(config.catalog_path.as_deref())?;
        Ok(Self::assemble(storage, catalog, CurrencyCode::default(), None).await)
    }

    /// Build the full state and restore any persisted session.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Catalog` if a configured catalog file is unreadable.
    pub async fn connect(config: &StorefrontConfig) -> Result<Self, AppError> {
        let storage: Arc<dyn KeyValueStorage> =
            Arc::new(FileStorage::new(&config.cart.data_dir));
        let catalog = Catalog::load_or_bundled(config.cart.catalog_path.as_deref())?;

        let client = SupabaseClient::new(&config.supabase);
        let identity = SupabaseAuth::restore(
            client.clone(),
            Arc::clone(&storage),
            config.supabase.email_redirect_url.clone(),
        )
        .await;

        let backend = Backend {
            store: Arc::new(SupabaseRest::new(client.clone())),
            identity: Arc::new(identity),
            gateway: Arc::new(EdgeFunctionGateway::new(
                client,
                config.supabase.payment_function.clone(),
            )),
            profiles: ProfileCache::new(),
        };

        tracing::info!(url = %config.supabase.url, "Backend configured");
        Ok(Self::assemble(storage, catalog, config.currency, Some(backend)).await)
    }

    /// Build a state from explicit collaborators.
    pub async fn with_backend(
        storage: Arc<dyn KeyValueStorage>,
        catalog: Catalog,
        currency: CurrencyCode,
        backend: Backend,
    ) -> Self {
        Self::assemble(storage, catalog, currency, Some(backend)).await
    }

    async fn assemble(
        storage: Arc<dyn KeyValueStorage>,
        catalog: Catalog,
        currency: CurrencyCode,
        backend: Option<Backend>,
    ) -> Self {
        let cart = CartStore::open(Arc::clone(&storage)).await;
        Self {
            inner: Arc::new(AppStateInner {
                storage,
                catalog,
                cart,
                currency,
                backend,
            }),
        }
    }

    /// The cart store.
    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    /// The product catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// The local key-value storage.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn KeyValueStorage> {
        &self.inner.storage
    }

    /// Currency used for charges.
    #[must_use]
    pub fn currency(&self) -> CurrencyCode {
        self.inner.currency
    }

    /// Backend collaborators.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the state was built without a backend.
    pub fn backend(&self) -> Result<&Backend, AppError> {
        self.inner
            .backend
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar("GTM_SUPABASE_URL".to_string()).into())
    }

    /// Authentication service.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` without a backend.
    pub fn auth(&self) -> Result<AuthService<'_>, AppError> {
        let backend = self.backend()?;
        Ok(AuthService::new(
            backend.identity.as_ref(),
            backend.store.as_ref(),
            &backend.profiles,
        ))
    }

    /// Profile service.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` without a backend.
    pub fn profiles(&self) -> Result<ProfileService<'_>, AppError> {
        let backend = self.backend()?;
        Ok(ProfileService::new(
            backend.identity.as_ref(),
            backend.store.as_ref(),
            &backend.profiles,
        ))
    }

    /// Checkout service.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` without a backend.
    pub fn checkout(&self) -> Result<CheckoutService<'_>, AppError> {
        let backend = self.backend()?;
        Ok(CheckoutService::new(
            backend.identity.as_ref(),
            &self.inner.cart,
            backend.gateway.as_ref(),
            self.inner.currency,
        ))
    }

    /// Order repository.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` without a backend.
    pub fn orders(&self) -> Result<OrderRepository<'_>, AppError> {
        Ok(OrderRepository::new(self.backend()?.store.as_ref()))
    }

    /// Contact message repository.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` without a backend.
    pub fn contact(&self) -> Result<ContactRepository<'_>, AppError> {
        Ok(ContactRepository::new(self.backend()?.store.as_ref()))
    }
}
