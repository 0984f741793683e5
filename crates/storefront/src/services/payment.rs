//! Payment processing.
//!
//! Charges are made by a server-side function; the client only sends the
//! order payload and an opaque payment token (a card token or a PayPal order
//! id). Raw card data never leaves the device, but it is validated locally
//! before a token is requested.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use gtm_shop_core::{Email, OrderId, PaymentMethod, Price};

use crate::models::Order;
use crate::supabase::SupabaseError;

/// Errors that can occur while validating or processing a payment.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Card input failed local validation.
    #[error("invalid card: {0}")]
    InvalidCard(String),

    /// PayPal input failed local validation.
    #[error("invalid PayPal details: {0}")]
    InvalidPaypal(String),

    /// The amount cannot be charged.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The processor declined the payment.
    #[error("payment declined: {0}")]
    Declined(String),

    /// The payment function could not be reached or failed.
    #[error("payment gateway error: {0}")]
    Gateway(#[from] SupabaseError),
}

// =============================================================================
// Local validation
// =============================================================================

/// Card details as typed by the user.
#[derive(Clone)]
pub struct CardDetails {
    pub number: String,
    pub holder: String,
    /// Expiry as `MM/YY`.
    pub expiry: String,
    pub cvv: String,
}

impl std::fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardDetails")
            .field("number", &"[REDACTED]")
            .field("holder", &self.holder)
            .field("expiry", &self.expiry)
            .field("cvv", &"[REDACTED]")
            .finish()
    }
}

impl CardDetails {
    /// Check the card fields.
    ///
    /// Spaces in the number are ignored. The number must be 16 digits, the
    /// holder non-blank, the expiry `MM/YY` with month 01-12, and the CVV 3
    /// or 4 digits.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidCard` describing the first problem.
    pub fn validate(&self) -> Result<(), PaymentError> {
        let number: String = self.number.chars().filter(|c| !c.is_whitespace()).collect();
        if number.len() != 16 || !number.chars().all(|c| c.is_ascii_digit()) {
            return Err(PaymentError::InvalidCard(
                "Please enter a valid 16-digit card number".to_string(),
            ));
        }

        if self.holder.trim().is_empty() {
            return Err(PaymentError::InvalidCard(
                "Please enter the cardholder name".to_string(),
            ));
        }

        let bad_expiry = || PaymentError::InvalidCard("Please enter a valid expiry date (MM/YY)".to_string());
        let (month, year) = self.expiry.trim().split_once('/').ok_or_else(bad_expiry)?;
        let two_digits = |s: &str| s.len() == 2 && s.chars().all(|c| c.is_ascii_digit());
        if !two_digits(month) || !two_digits(year) {
            return Err(bad_expiry());
        }
        if !matches!(month.parse::<u8>(), Ok(1..=12)) {
            return Err(PaymentError::InvalidCard(
                "Please enter a valid month (01-12)".to_string(),
            ));
        }

        if !matches!(self.cvv.len(), 3 | 4) || !self.cvv.chars().all(|c| c.is_ascii_digit()) {
            return Err(PaymentError::InvalidCard(
                "Please enter a valid CVV (3 or 4 digits)".to_string(),
            ));
        }

        Ok(())
    }
}

/// PayPal sign-in details as typed by the user.
#[derive(Clone)]
pub struct PaypalCredentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for PaypalCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaypalCredentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl PaypalCredentials {
    /// Check the PayPal fields.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidPaypal` if the email is malformed or the
    /// password is shorter than 6 characters.
    pub fn validate(&self) -> Result<(), PaymentError> {
        if Email::parse(self.email.trim()).is_err() {
            return Err(PaymentError::InvalidPaypal(
                "Please enter a valid PayPal email address".to_string(),
            ));
        }
        if self.password.chars().count() < 6 {
            return Err(PaymentError::InvalidPaypal(
                "Please enter your PayPal password".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Gateway contract
// =============================================================================

/// A charge request for one order.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub method: PaymentMethod,
    /// Amount to charge, rounded to cents.
    pub amount: Price,
    /// Order payload the processor records alongside the charge.
    pub order: Order,
    /// Card token or PayPal order id, depending on `method`.
    pub token: String,
}

impl PaymentRequest {
    /// Build a request for `order`'s total.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidAmount` if the total is not a positive
    /// finite amount.
    pub fn for_order(
        method: PaymentMethod,
        order: Order,
        currency: gtm_shop_core::CurrencyCode,
        token: impl Into<String>,
    ) -> Result<Self, PaymentError> {
        let amount = Price::from_f64(order.total_amount, currency)
            .filter(|p| p.amount.is_sign_positive() && !p.amount.is_zero())
            .ok_or_else(|| PaymentError::InvalidAmount(order.total_amount.to_string()))?;

        Ok(Self {
            method,
            amount,
            order,
            token: token.into(),
        })
    }

    /// JSON body for the payment function.
    #[must_use]
    pub fn to_body(&self) -> serde_json::Value {
        let mut body = json!({
            "paymentMethod": self.method,
            "amount": self.amount.amount.to_f64().unwrap_or_default(),
            "currency": self.amount.currency_code.lower_code(),
            "orderData": {
                "user_id": self.order.user_id,
                "user_email": self.order.user_email,
                "items": self.order.items,
                "shipping_info": self.order.shipping_info,
                "total_amount": self.order.total_amount,
            },
        });

        let token_field = match self.method {
            PaymentMethod::CreditCard => "stripeToken",
            PaymentMethod::Paypal => "paypalOrderId",
        };
        if let Some(fields) = body.as_object_mut() {
            fields.insert(token_field.to_string(), json!(self.token));
        }
        body
    }
}

/// What the processor reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOutcome {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub order_id: Option<OrderId>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Server-side payment processor.
#[async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    /// Charge the request. A decline is reported as `success == false`.
    async fn process(&self, request: &PaymentRequest) -> Result<PaymentOutcome, PaymentError>;
}

// =============================================================================
// Recording gateway
// =============================================================================

/// Gateway that records requests and replays scripted outcomes.
///
/// With nothing scripted every request is approved with fresh ids.
#[derive(Debug, Clone, Default)]
pub struct RecordingGateway {
    inner: Arc<RecordingGatewayInner>,
}

#[derive(Debug, Default)]
struct RecordingGatewayInner {
    requests: Mutex<Vec<PaymentRequest>>,
    script: Mutex<VecDeque<Result<PaymentOutcome, String>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RecordingGateway {
    /// Creates a gateway that approves everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decline the next request with `reason`.
    pub fn decline_next(&self, reason: &str) {
        lock(&self.inner.script).push_back(Ok(PaymentOutcome {
            success: false,
            error: Some(reason.to_string()),
            ..PaymentOutcome::default()
        }));
    }

    /// Fail the next request as if the function were unreachable.
    pub fn fail_next(&self, message: &str) {
        lock(&self.inner.script).push_back(Err(message.to_string()));
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<PaymentRequest> {
        lock(&self.inner.requests).clone()
    }
}

#[async_trait]
impl PaymentGateway for RecordingGateway {
    async fn process(&self, request: &PaymentRequest) -> Result<PaymentOutcome, PaymentError> {
        lock(&self.inner.requests).push(request.clone());

        match lock(&self.inner.script).pop_front() {
            Some(Ok(outcome)) => Ok(outcome),
            Some(Err(message)) => Err(PaymentError::Gateway(SupabaseError::Api {
                status: 503,
                code: None,
                message,
            })),
            None => Ok(PaymentOutcome {
                success: true,
                payment_id: Some(format!("pay_{}", uuid::Uuid::new_v4().simple())),
                order_id: Some(OrderId::random()),
                error: None,
            }),
        }
    }
}
