//! Catalog products and cart lines.
//!
//! These are the records persisted in the cart slot, so their serialized
//! shape is a storage contract: camelCase keys, optional keys omitted when
//! absent.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::ProductId;

/// Errors raised when an externally supplied product fails validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProductError {
    /// The product identifier is empty.
    #[error("product id cannot be empty")]
    EmptyId,
    /// The unit price is negative, NaN, or infinite.
    #[error("product {id} has invalid price {price}")]
    InvalidPrice {
        /// Offending product.
        id: ProductId,
        /// Offending price.
        price: f64,
    },
    /// The rating is NaN or infinite.
    #[error("product {0} has an invalid rating")]
    InvalidRating(ProductId),
}

/// A catalog product (read-only reference data).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique product identifier.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Long-form description.
    pub description: String,
    /// Unit price in the store currency.
    pub price: f64,
    /// Category name used for browsing.
    pub category: String,
    /// Image reference (URL or bundled asset name).
    pub image: String,
    /// Average review rating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    /// Number of reviews.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<u32>,
    /// Stock availability flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_stock: Option<bool>,
}

impl Product {
    /// Validate a product that entered from outside (storage, catalog file).
    ///
    /// # Errors
    ///
    /// Returns `ProductError` if the id is empty, the price is negative or
    /// not finite, or the rating is not finite.
    pub fn validate(&self) -> Result<(), ProductError> {
        if self.id.as_str().is_empty() {
            return Err(ProductError::EmptyId);
        }

        if !self.price.is_finite() || self.price < 0.0 {
            return Err(ProductError::InvalidPrice {
                id: self.id.clone(),
                price: self.price,
            });
        }

        if self.rating.is_some_and(|r| !r.is_finite()) {
            return Err(ProductError::InvalidRating(self.id.clone()));
        }

        Ok(())
    }

    /// Whether the product can currently be bought.
    ///
    /// Products without an explicit flag are treated as available.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.in_stock.unwrap_or(true)
    }
}

/// One (product, quantity) pair in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    /// The product snapshot taken when it was added.
    pub product: Product,
    /// Number of units; always positive while the line exists.
    pub quantity: u32,
}

impl CartLine {
    /// Create a new cart line.
    #[must_use]
    pub const fn new(product: Product, quantity: u32) -> Self {
        Self { product, quantity }
    }

    /// Unit price multiplied by quantity.
    #[must_use]
    pub fn line_total(&self) -> f64 {
        self.product.price * f64::from(self.quantity)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

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
            in_stock: None,
        }
    }

    #[test]
    fn test_serialized_keys_are_camel_case() {
        let mut p = product("a", 9.99);
        p.in_stock = Some(false);
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["inStock"], serde_json::json!(false));
        assert!(json.get("rating").is_none());
        assert!(json.get("reviews").is_none());
    }

    #[test]
    fn test_deserialize_without_optional_fields() {
        let json = r#"{"id":"b","name":"Mug","description":"","price":5.0,
                       "category":"Home","image":"mug.png"}"#;
        let p: Product = serde_json::from_str(json).unwrap();
        assert_eq!(p.id.as_str(), "b");
        assert!(p.rating.is_none());
        assert!(p.is_available());
    }

    #[test]
    fn test_validate_rejects_negative_price() {
        let p = product("a", -1.0);
        assert!(matches!(
            p.validate(),
            Err(ProductError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_empty_id() {
        assert_eq!(product("", 1.0).validate(), Err(ProductError::EmptyId));
    }

    #[test]
    fn test_validate_accepts_free_product() {
        assert!(product("gift", 0.0).validate().is_ok());
    }

    #[test]
    fn test_line_total() {
        let line = CartLine::new(product("a", 10.0), 3);
        assert!((line.line_total() - 30.0).abs() < f64::EPSILON);
    }
}
