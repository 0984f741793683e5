//! Checkout commands.

use gtm_shop_core::PaymentMethod;
use gtm_shop_storefront::error::AppError;
use gtm_shop_storefront::models::{AuthUser, ShippingInfo};
use gtm_shop_storefront::services::{CardDetails, PaypalCredentials, Receipt};
use gtm_shop_storefront::state::AppState;

/// Shipping details from the command line. Name and email are optional and
/// default to the signed-in user's.
pub struct ShippingInput {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

impl ShippingInput {
    fn resolve(self, user: &AuthUser) -> ShippingInfo {
        ShippingInfo {
            full_name: self
                .full_name
                .or_else(|| user.display_name.clone())
                .unwrap_or_default(),
            email: self
                .email
                .or_else(|| user.email.as_ref().map(ToString::to_string))
                .unwrap_or_default(),
            phone: self.phone,
            address: self.address,
            city: self.city,
            state: self.state,
            zip_code: self.zip_code,
            country: self.country,
        }
    }
}

/// Pay for the cart by card.
///
/// The card is validated locally; only `token` is sent.
///
/// # Errors
///
/// Returns `AppError::Payment` for invalid card input, `AppError::Checkout`
/// if the order cannot be placed.
pub async fn card(
    state: &AppState,
    card: &CardDetails,
    token: &str,
    shipping: ShippingInput,
) -> Result<(), AppError> {
    card.validate()?;
    place(state, PaymentMethod::CreditCard, token, shipping).await
}

/// Pay for the cart with PayPal.
///
/// # Errors
///
/// Returns `AppError::Payment` for invalid PayPal input, `AppError::Checkout`
/// if the order cannot be placed.
pub async fn paypal(
    state: &AppState,
    credentials: &PaypalCredentials,
    order_id: &str,
    shipping: ShippingInput,
) -> Result<(), AppError> {
    credentials.validate()?;
    place(state, PaymentMethod::Paypal, order_id, shipping).await
}

async fn place(
    state: &AppState,
    method: PaymentMethod,
    token: &str,
    shipping: ShippingInput,
) -> Result<(), AppError> {
    let user = state.auth()?.require_user().await?;
    let shipping = shipping.resolve(&user);

    let receipt = state
        .checkout()?
        .place_order(&shipping, method, token)
        .await?;
    print_receipt(&receipt);
    Ok(())
}

fn print_receipt(receipt: &Receipt) {
    println!("Payment successful");
    if let Some(reference) = &receipt.short_ref {
        println!("  Order #{reference}");
    }
    println!("  Amount {}", receipt.total);
    println!("  Method {}", receipt.method.label());
    if let Some(payment_id) = &receipt.payment_id {
        println!("  Payment {payment_id}");
    }
}
