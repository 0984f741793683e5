//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type for the front ends. `user_message()`
//! gives text that is safe to show in an alert; `report()` captures backend
//! and internal failures to Sentry before the message is shown.

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::db::RepositoryError;
use crate::models::FieldError;
use crate::services::{AuthError, CheckoutError, PaymentError, ProfileError};
use crate::storage::StorageError;
use crate::supabase::SupabaseError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration is missing or invalid.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Local storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The product catalog could not be loaded.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Remote data store operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Hosted backend call failed.
    #[error("Backend error: {0}")]
    Backend(#[from] SupabaseError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Payment validation or processing failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Checkout failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Profile operation failed.
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    /// User input failed validation.
    #[error("Invalid input: {0}")]
    Field(#[from] FieldError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from the user.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this error is a failure of ours or of a backend, as opposed to
    /// a problem with the user's input.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        match self {
            Self::Config(_)
            | Self::Storage(_)
            | Self::Catalog(_)
            | Self::Database(_)
            | Self::Backend(_)
            | Self::Internal(_)
            | Self::Auth(AuthError::Backend(_))
            | Self::Payment(PaymentError::Gateway(_))
            | Self::Checkout(CheckoutError::Payment(PaymentError::Gateway(_)))
            | Self::Profile(ProfileError::Repository(_)) => true,
            Self::Auth(_)
            | Self::Payment(_)
            | Self::Checkout(_)
            | Self::Profile(_)
            | Self::Field(_)
            | Self::NotFound(_)
            | Self::BadRequest(_) => false,
        }
    }

    /// Capture internal failures to Sentry and log them.
    ///
    /// User errors are only logged at debug level.
    pub fn report(&self) {
        if self.is_internal() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Operation failed"
            );
        } else {
            tracing::debug!(error = %self, "Rejected user request");
        }
    }

    /// Text safe to show to the user. Never exposes internal details.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(err) => format!("The app is not configured: {err}"),
            Self::Storage(_) | Self::Catalog(_) | Self::Internal(_) => {
                "Something went wrong, please try again".to_string()
            }
            Self::Database(err) => repository_message(err),
            Self::Backend(err) => backend_message(err),
            Self::Auth(err) => auth_message(err),
            Self::Payment(err) => payment_message(err),
            Self::Checkout(err) => match err {
                CheckoutError::NotSignedIn => "Please sign in to check out".to_string(),
                CheckoutError::EmptyCart => "Your cart is empty".to_string(),
                CheckoutError::Shipping(field) => field_message(field),
                CheckoutError::Payment(err) => payment_message(err),
            },
            Self::Profile(err) => match err {
                ProfileError::NotSignedIn => {
                    "You must be logged in to update your profile".to_string()
                }
                ProfileError::Field(field) => field_message(field),
                ProfileError::Repository(err) => repository_message(err),
            },
            Self::Field(field) => field_message(field),
            Self::NotFound(what) => format!("{what} not found"),
            Self::BadRequest(msg) => msg.clone(),
        }
    }
}

fn field_message(err: &FieldError) -> String {
    match err {
        FieldError::Missing(field) => format!("Please fill in {}", field.replace('_', " ")),
        FieldError::InvalidEmail(_) => "Please enter a valid email address".to_string(),
    }
}

fn backend_message(err: &SupabaseError) -> String {
    match err {
        SupabaseError::RateLimited(secs) => {
            format!("Too many requests, please try again in {secs} seconds")
        }
        SupabaseError::Http(_) => "Could not reach the server, check your connection".to_string(),
        _ => "The server could not complete the request".to_string(),
    }
}

fn repository_message(err: &RepositoryError) -> String {
    match err {
        RepositoryError::NotFound => "Not found".to_string(),
        RepositoryError::Backend(err) => backend_message(err),
        _ => "The server could not complete the request".to_string(),
    }
}

fn auth_message(err: &AuthError) -> String {
    match err {
        AuthError::InvalidEmail(_) => "Please enter a valid email address".to_string(),
        AuthError::WeakPassword(msg) => msg.clone(),
        AuthError::InvalidCredentials => "Invalid email or password".to_string(),
        AuthError::EmailNotConfirmed => {
            "Please confirm your email address before signing in".to_string()
        }
        AuthError::UserAlreadyExists => "An account with this email already exists".to_string(),
        AuthError::ConfirmationRequired => {
            "Account created. Check your email to confirm it, then sign in".to_string()
        }
        AuthError::NotSignedIn => "Please sign in first".to_string(),
        AuthError::Backend(err) => backend_message(err),
    }
}

fn payment_message(err: &PaymentError) -> String {
    match err {
        PaymentError::InvalidCard(msg) | PaymentError::InvalidPaypal(msg) => msg.clone(),
        PaymentError::InvalidAmount(_) => "The order total is not valid".to_string(),
        PaymentError::Declined(reason) => format!("Payment failed: {reason}"),
        PaymentError::Gateway(err) => backend_message(err),
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

// =============================================================================
// Sentry context
// =============================================================================

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "3")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data.unwrap_or_default() {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("Product 9".to_string());
        assert_eq!(err.to_string(), "Not found: Product 9");
        assert_eq!(err.user_message(), "Product 9 not found");
    }

    #[test]
    fn test_internal_classification() {
        assert!(AppError::Internal("boom".to_string()).is_internal());
        assert!(AppError::Database(RepositoryError::NotFound).is_internal());
        assert!(
            AppError::Payment(PaymentError::Gateway(SupabaseError::RateLimited(5))).is_internal()
        );
        assert!(!AppError::Auth(AuthError::InvalidCredentials).is_internal());
        assert!(!AppError::Checkout(CheckoutError::EmptyCart).is_internal());
        assert!(
            !AppError::Checkout(CheckoutError::Payment(PaymentError::Declined(
                "card declined".to_string()
            )))
            .is_internal()
        );
    }

    #[test]
    fn test_user_messages_hide_internals() {
        let err = AppError::Backend(SupabaseError::Api {
            status: 500,
            code: Some("XX000".to_string()),
            message: "relation \"orders\" does not exist".to_string(),
        });
        assert!(!err.user_message().contains("relation"));

        let err = AppError::Internal("secret path /var/lib".to_string());
        assert!(!err.user_message().contains("/var/lib"));
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            AppError::Field(FieldError::Missing("zip_code")).user_message(),
            "Please fill in zip code"
        );
        assert_eq!(
            AppError::Checkout(CheckoutError::Payment(PaymentError::Declined(
                "Insufficient funds".to_string()
            )))
            .user_message(),
            "Payment failed: Insufficient funds"
        );
        assert_eq!(
            AppError::Backend(SupabaseError::RateLimited(30)).user_message(),
            "Too many requests, please try again in 30 seconds"
        );
    }

    #[test]
    fn test_breadcrumb_without_client_is_noop() {
        add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "3")]));
        add_breadcrumb("cart", "Cleared", None);
        set_sentry_user(&"user-1", Some("ada@example.com"));
        clear_sentry_user();
    }
}
