//! Encoding and boundary validation of the persisted cart blob.
//!
//! The slot holds a JSON array of `{product, quantity}` objects. An empty cart
//! is never encoded; its slot is deleted instead.

use std::collections::HashSet;

use gtm_shop_core::{CartLine, ProductError, ProductId};
use thiserror::Error;

/// Reasons a persisted cart blob is rejected during rehydration.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Blob is not a JSON array of cart lines.
    #[error("malformed cart JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A product in the blob failed validation.
    #[error("invalid product in cart: {0}")]
    Product(#[from] ProductError),

    /// A line carries a zero quantity.
    #[error("cart line for {0} has zero quantity")]
    ZeroQuantity(ProductId),

    /// The same product appears on two lines.
    #[error("product {0} appears on more than one cart line")]
    DuplicateProduct(ProductId),
}

/// Serialize cart lines for the storage slot.
///
/// Returns `Ok(None)` when the cart is empty, meaning the slot should be
/// deleted rather than written.
///
/// # Errors
///
/// Returns `serde_json::Error` if serialization fails.
pub fn encode(lines: &[CartLine]) -> Result<Option<String>, serde_json::Error> {
    if lines.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(lines).map(Some)
}

/// Parse and validate a persisted cart blob.
///
/// # Errors
///
/// Returns `SnapshotError` if the JSON is malformed or any line violates the
/// cart invariants (valid product, positive quantity, unique product id).
pub fn decode(raw: &str) -> Result<Vec<CartLine>, SnapshotError> {
    let lines: Vec<CartLine> = serde_json::from_str(raw)?;

    let mut seen = HashSet::with_capacity(lines.len());
    for line in &lines {
        line.product.validate()?;

        if line.quantity == 0 {
            return Err(SnapshotError::ZeroQuantity(line.product.id.clone()));
        }

        if !seen.insert(&line.product.id) {
            return Err(SnapshotError::DuplicateProduct(line.product.id.clone()));
        }
    }

    Ok(lines)
}
