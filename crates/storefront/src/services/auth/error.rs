//! Authentication error types.

use thiserror::Error;

use crate::supabase::SupabaseError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] gtm_shop_core::EmailError),

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Wrong email or password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The account exists but its email has not been confirmed.
    #[error("email not confirmed")]
    EmailNotConfirmed,

    /// An account with this email already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Sign-up succeeded but the email must be confirmed before signing in.
    #[error("email confirmation required")]
    ConfirmationRequired,

    /// The operation needs a signed-in user.
    #[error("not signed in")]
    NotSignedIn,

    /// The identity backend failed.
    #[error("identity backend error: {0}")]
    Backend(#[from] SupabaseError),
}
