//! Domain records exchanged with the hosted backend.
//!
//! Field names match the backend's snake_case columns so records serialize
//! directly into insert and update payloads.

pub mod contact;
pub mod order;
pub mod profile;
pub mod user;

pub use contact::ContactMessage;
pub use order::{Order, OrderItem, ShippingInfo};
pub use profile::{ProfileUpdate, UserProfile};
pub use user::{AuthUser, Session};

use gtm_shop_core::EmailError;
use thiserror::Error;

/// A user-supplied record failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// A required field is blank.
    #[error("{0} is required")]
    Missing(&'static str),

    /// An email field is not a valid address.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),
}

/// Trim `value` and reject it if blank.
pub(crate) fn required(field: &'static str, value: &str) -> Result<String, FieldError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FieldError::Missing(field));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_trims() {
        assert_eq!(required("name", "  Ada "), Ok("Ada".to_string()));
        assert_eq!(required("name", " \t"), Err(FieldError::Missing("name")));
    }

    #[test]
    fn test_field_error_display() {
        assert_eq!(FieldError::Missing("city").to_string(), "city is required");
    }
}
