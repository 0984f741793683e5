//! Authenticated user and session types.

use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;

use gtm_shop_core::{Email, UserId};

/// The signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// Identity provider's user id.
    pub id: UserId,
    /// Email address, if the identity has one.
    pub email: Option<Email>,
    /// Display name from the user metadata.
    pub display_name: Option<String>,
}

impl AuthUser {
    /// Display name, falling back to the email local part.
    #[must_use]
    pub fn name_or_email(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .or_else(|| self.email.as_ref().map(Email::local_part))
    }
}

/// An authenticated session.
///
/// Tokens are secrets and are never printed by `Debug`.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

impl Session {
    /// Whether the access token has expired (with a 30 second margin).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at - Duration::seconds(30) <= Utc::now()
    }
}
