//! Command implementations. Results are printed to stdout; logs go to stderr.

#![allow(clippy::print_stdout)]

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod contact;
pub mod orders;
pub mod profile;

use gtm_shop_core::Price;
use gtm_shop_storefront::state::AppState;

/// Format an amount in the store currency, rounded to cents.
fn money(state: &AppState, amount: f64) -> String {
    Price::from_f64(amount, state.currency()).map_or_else(|| "-".to_string(), |p| p.display())
}
