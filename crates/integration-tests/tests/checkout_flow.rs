//! Account, profile, and checkout flows against in-memory collaborators.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use gtm_shop_core::{OrderStatus, PaymentMethod, ProductId};
use gtm_shop_integration_tests::TestContext;
use gtm_shop_storefront::db::Table;
use gtm_shop_storefront::error::AppError;
use gtm_shop_storefront::models::{ProfileUpdate, ShippingInfo};
use gtm_shop_storefront::services::{AuthError, CheckoutError, PaymentError};
use gtm_shop_storefront::storage::{CART_STORAGE_KEY, MemoryStorage};

fn shipping() -> ShippingInfo {
    ShippingInfo {
        full_name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        phone: "555-0100".to_string(),
        address: "1 Analytical Way".to_string(),
        city: "London".to_string(),
        state: "LDN".to_string(),
        zip_code: "N1".to_string(),
        country: "UK".to_string(),
    }
}

async fn signed_in_with_cart(storage: &MemoryStorage) -> TestContext {
    let ctx = TestContext::new(Arc::new(storage.clone())).await;
    ctx.state
        .auth()
        .unwrap()
        .sign_up("Ada@Example.com", "hunter22", Some("Ada"))
        .await
        .unwrap();

    let catalog = ctx.state.catalog();
    let hoodie = catalog.get(&ProductId::new("2")).unwrap().clone();
    let pins = catalog.get(&ProductId::new("6")).unwrap().clone();
    ctx.state.cart().add_to_cart(hoodie, 1);
    ctx.state.cart().add_to_cart(pins, 3);
    ctx.state.cart().flushed().await;
    ctx
}

// ============================================================================
// Checkout
// ============================================================================

#[tokio::test]
async fn test_checkout_success_clears_persisted_cart() {
    let storage = MemoryStorage::new();
    let ctx = signed_in_with_cart(&storage).await;
    let expected_total = ctx.state.cart().cart_total();

    let receipt = ctx
        .state
        .checkout()
        .unwrap()
        .place_order(&shipping(), PaymentMethod::CreditCard, "tok_visa")
        .await
        .unwrap();

    assert_eq!(receipt.item_count, 4);
    assert_eq!(receipt.method, PaymentMethod::CreditCard);
    assert!(receipt.short_ref.is_some());

    let request = &ctx.gateway.requests()[0];
    assert!((request.order.total_amount - expected_total).abs() < 1e-9);
    assert_eq!(request.order.status, OrderStatus::Pending);
    assert_eq!(request.to_body()["stripeToken"], "tok_visa");

    assert!(ctx.state.cart().is_empty());
    ctx.state.cart().flushed().await;
    assert!(!storage.contains(CART_STORAGE_KEY));
}

#[tokio::test]
async fn test_declined_payment_keeps_cart() {
    let storage = MemoryStorage::new();
    let ctx = signed_in_with_cart(&storage).await;
    ctx.gateway.decline_next("Card expired");
    let before = ctx.state.cart().lines();

    let err = ctx
        .state
        .checkout()
        .unwrap()
        .place_order(&shipping(), PaymentMethod::Paypal, "PP-123")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::Payment(PaymentError::Declined(_))
    ));
    assert_eq!(
        AppError::from(err).user_message(),
        "Payment failed: Card expired"
    );
    assert_eq!(ctx.state.cart().lines(), before);
    assert!(storage.contains(CART_STORAGE_KEY));
}

#[tokio::test]
async fn test_signed_out_checkout_is_rejected() {
    let storage = MemoryStorage::new();
    let ctx = signed_in_with_cart(&storage).await;
    ctx.state.auth().unwrap().sign_out().await.unwrap();

    let err = ctx
        .state
        .checkout()
        .unwrap()
        .place_order(&shipping(), PaymentMethod::CreditCard, "tok")
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::NotSignedIn));
    assert_eq!(ctx.state.cart().len(), 2);
}

// ============================================================================
// Accounts and profiles
// ============================================================================

#[tokio::test]
async fn test_sign_up_creates_profile_and_sign_out_keeps_cart() {
    let storage = MemoryStorage::new();
    let ctx = signed_in_with_cart(&storage).await;

    let rows = ctx.store.rows(Table::UserProfiles);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["email"], "ada@example.com");

    ctx.state.auth().unwrap().sign_out().await.unwrap();
    assert_eq!(ctx.state.cart().cart_item_count(), 4);

    let again = ctx
        .state
        .auth()
        .unwrap()
        .sign_up("ada@example.com", "hunter22", None)
        .await;
    assert!(matches!(again, Err(AuthError::UserAlreadyExists)));
}

#[tokio::test]
async fn test_profile_save_round_trip() {
    let storage = MemoryStorage::new();
    let ctx = signed_in_with_cart(&storage).await;
    let profiles = ctx.state.profiles().unwrap();

    let saved = profiles
        .save(
            "Countess Lovelace",
            ProfileUpdate {
                city: Some("London".to_string()),
                country: Some("UK".to_string()),
                ..ProfileUpdate::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(saved.display_name.as_deref(), Some("Countess Lovelace"));
    assert_eq!(profiles.current().await.unwrap(), Some(saved));
    assert_eq!(ctx.store.rows(Table::UserProfiles).len(), 1);
}
