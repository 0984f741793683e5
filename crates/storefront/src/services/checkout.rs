//! Checkout: turn the cart into a paid order.

use thiserror::Error;
use tracing::instrument;

use gtm_shop_core::{CurrencyCode, Email, OrderId, PaymentMethod, Price};

use super::auth::IdentityProvider;
use super::payment::{PaymentError, PaymentGateway, PaymentRequest};
use crate::cart::CartStore;
use crate::error::add_breadcrumb;
use crate::models::{FieldError, Order, ShippingInfo};

/// Errors that can occur while placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Checkout requires a signed-in user.
    #[error("sign in to check out")]
    NotSignedIn,

    /// There is nothing to buy.
    #[error("cart is empty")]
    EmptyCart,

    /// Shipping details are incomplete or malformed.
    #[error("invalid shipping details: {0}")]
    Shipping(#[from] FieldError),

    /// The payment was declined or could not be processed.
    #[error(transparent)]
    Payment(#[from] PaymentError),
}

/// Confirmation of a paid order.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub order_id: Option<OrderId>,
    /// First 8 characters of the order id, upper-cased.
    pub short_ref: Option<String>,
    pub payment_id: Option<String>,
    pub method: PaymentMethod,
    pub total: Price,
    pub item_count: u64,
}

/// Checkout service.
pub struct CheckoutService<'a> {
    identity: &'a dyn IdentityProvider,
    cart: &'a CartStore,
    gateway: &'a dyn PaymentGateway,
    currency: CurrencyCode,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(
        identity: &'a dyn IdentityProvider,
        cart: &'a CartStore,
        gateway: &'a dyn PaymentGateway,
        currency: CurrencyCode,
    ) -> Self {
        Self {
            identity,
            cart,
            gateway,
            currency,
        }
    }

    /// Pay for the current cart and take the paid lines out of it.
    ///
    /// The paid lines are only removed once the payment is approved; on any
    /// error the cart is left as it was. Items added while the payment is in
    /// flight stay in the cart.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::NotSignedIn` if nobody is signed in.
    /// Returns `CheckoutError::Shipping` if a shipping field is blank or the
    /// email is malformed.
    /// Returns `CheckoutError::EmptyCart` if the cart has no lines.
    /// Returns `CheckoutError::Payment` if the payment is declined or fails.
    #[instrument(skip(self, shipping, token))]
    pub async fn place_order(
        &self,
        shipping: &ShippingInfo,
        method: PaymentMethod,
        token: &str,
    ) -> Result<Receipt, CheckoutError> {
        let user = self
            .identity
            .current_user()
            .await
            .ok_or(CheckoutError::NotSignedIn)?;
        let shipping = shipping.validated()?;

        let lines = self.cart.lines();
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let user_email = user
            .email
            .as_ref()
            .map_or_else(|| shipping.email.clone(), |e| Email::as_str(e).to_string());
        let order = Order::from_cart(user.id, user_email, &lines, shipping);
        let item_count = order.item_count();
        let request = PaymentRequest::for_order(method, order, self.currency, token)?;

        add_breadcrumb(
            "checkout",
            "Submitting payment",
            Some(&[("method", method.as_str())]),
        );

        let outcome = self.gateway.process(&request).await.map_err(|e| {
            tracing::warn!(error = %e, "Payment failed, cart kept");
            e
        })?;

        if !outcome.success {
            let reason = outcome
                .error
                .unwrap_or_else(|| "Payment was declined".to_string());
            tracing::warn!(reason = %reason, "Payment declined, cart kept");
            return Err(PaymentError::Declined(reason).into());
        }

        self.cart.remove_lines(&lines);

        let receipt = Receipt {
            order_id: outcome.order_id,
            short_ref: outcome.order_id.map(|id| id.short_ref()),
            payment_id: outcome.payment_id,
            method,
            total: request.amount,
            item_count,
        };
        tracing::info!(
            order_id = ?receipt.order_id,
            total = %receipt.total,
            "Order placed"
        );
        Ok(receipt)
    }
}
