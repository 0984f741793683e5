//! Type-safe price representation using decimal arithmetic.
//!
//! Cart totals are computed as `f64` sums (see the storefront cart store).
//! Anything that leaves the device as money, such as a payment amount, is
//! converted to a [`Price`] first so the amount is an exact decimal rounded
//! to the currency's minor unit.

use core::fmt;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a price from an amount in minor units (e.g., cents).
    #[must_use]
    pub fn from_cents(cents: i64, currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::new(cents, 2), currency_code)
    }

    /// Convert a floating-point amount into a price rounded to cents.
    ///
    /// Midpoints round away from zero. Returns `None` for NaN or infinite
    /// input.
    #[must_use]
    pub fn from_f64(amount: f64, currency_code: CurrencyCode) -> Option<Self> {
        let amount = Decimal::from_f64(amount)?
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        Some(Self::new(amount, currency_code))
    }

    /// Format for display (e.g., "$19.99").
    #[must_use]
    pub fn display(&self) -> String {
        format!("{}{:.2}", self.currency_code.symbol(), self.amount)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// Upper-case ISO code (e.g., "USD").
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
        }
    }

    /// Lower-case ISO code as expected by payment processors (e.g., "usd").
    #[must_use]
    pub const fn lower_code(self) -> &'static str {
        match self {
            Self::USD => "usd",
            Self::EUR => "eur",
            Self::GBP => "gbp",
            Self::CAD => "cad",
            Self::AUD => "aud",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            _ => Err(format!("unsupported currency: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_f64_rounds_to_cents() {
        let price = Price::from_f64(49.949_999_999_999_996, CurrencyCode::USD).unwrap();
        assert_eq!(price.amount, Decimal::new(4995, 2));
    }

    #[test]
    fn test_from_f64_rejects_nan() {
        assert!(Price::from_f64(f64::NAN, CurrencyCode::USD).is_none());
        assert!(Price::from_f64(f64::INFINITY, CurrencyCode::USD).is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(Price::from_cents(1999, CurrencyCode::USD).display(), "$19.99");
        assert_eq!(Price::from_cents(500, CurrencyCode::GBP).to_string(), "£5.00");
    }

    #[test]
    fn test_currency_codes() {
        assert_eq!(CurrencyCode::USD.lower_code(), "usd");
        assert_eq!("eur".parse::<CurrencyCode>().unwrap(), CurrencyCode::EUR);
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }
}
