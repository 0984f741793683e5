//! Authentication service.
//!
//! Email and password accounts held by an external identity provider. The
//! provider is reached through [`IdentityProvider`]; [`AuthService`] adds
//! input normalization, profile bootstrapping, and error tracking context.

mod error;
mod memory;

pub use error::AuthError;
pub use memory::MemoryIdentity;

use async_trait::async_trait;
use tracing::instrument;

use gtm_shop_core::Email;

use crate::db::{ProfileCache, ProfileRepository, RemoteStore};
use crate::error::{add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::models::AuthUser;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Result of a sign-up call at the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// A new identity was created and a session opened.
    SignedIn(AuthUser),
    /// A new identity was created; the email must be confirmed first.
    ConfirmationRequired(AuthUser),
    /// The email already belongs to an identity.
    AlreadyRegistered,
}

/// External identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    /// The signed-in user, if any.
    async fn current_user(&self) -> Option<AuthUser>;

    /// Register a new identity.
    async fn sign_up(
        &self,
        email: &Email,
        password: &str,
        display_name: &str,
    ) -> Result<SignUpOutcome, AuthError>;

    /// Open a session with email and password.
    async fn sign_in(&self, email: &Email, password: &str) -> Result<AuthUser, AuthError>;

    /// Close the current session. Succeeds when nobody is signed in.
    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// Authentication service.
///
/// Handles sign-up, sign-in, and sign-out against the identity provider.
pub struct AuthService<'a> {
    identity: &'a dyn IdentityProvider,
    profiles: ProfileRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(
        identity: &'a dyn IdentityProvider,
        store: &'a dyn RemoteStore,
        cache: &'a ProfileCache,
    ) -> Self {
        Self {
            identity,
            profiles: ProfileRepository::new(store, cache),
        }
    }

    /// The signed-in user, if any.
    pub async fn current_user(&self) -> Option<AuthUser> {
        self.identity.current_user().await
    }

    /// The signed-in user, or `NotSignedIn`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotSignedIn` if there is no session.
    pub async fn require_user(&self) -> Result<AuthUser, AuthError> {
        self.current_user().await.ok_or(AuthError::NotSignedIn)
    }

    /// Register a new account.
    ///
    /// The email is trimmed and lowercased. The display name defaults to the
    /// email's local part. A profile row is created for new identities; a
    /// failure there is logged and does not fail the sign-up.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password is too short.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    /// Returns `AuthError::ConfirmationRequired` if the account was created but
    /// the email must be confirmed before signing in.
    #[instrument(skip(self, email, password, display_name))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<AuthUser, AuthError> {
        let email = Email::parse_normalized(email)?;
        validate_password(password)?;

        let display_name = display_name
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| email.local_part())
            .to_string();

        let (user, signed_in) = match self.identity.sign_up(&email, password, &display_name).await? {
            SignUpOutcome::AlreadyRegistered => return Err(AuthError::UserAlreadyExists),
            SignUpOutcome::SignedIn(user) => (user, true),
            SignUpOutcome::ConfirmationRequired(user) => (user, false),
        };

        if let Err(e) = self
            .profiles
            .create(user.id, email.as_str(), Some(&display_name))
            .await
        {
            tracing::warn!(error = %e, user_id = %user.id, "Profile creation failed, continuing with sign-up");
        }

        if !signed_in {
            tracing::info!(user_id = %user.id, "Sign-up requires email confirmation");
            return Err(AuthError::ConfirmationRequired);
        }

        set_sentry_user(&user.id, Some(email.as_str()));
        add_breadcrumb("auth", "Signed up", None);
        tracing::info!(user_id = %user.id, "User signed up");
        Ok(user)
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::InvalidCredentials` if the email or password is wrong.
    /// Returns `AuthError::EmailNotConfirmed` if the email is unconfirmed.
    #[instrument(skip(self, email, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let email = Email::parse_normalized(email)?;
        if password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let user = self.identity.sign_in(&email, password).await?;

        set_sentry_user(&user.id, user.email.as_ref().map(Email::as_str));
        add_breadcrumb("auth", "Signed in", None);
        tracing::info!(user_id = %user.id, "User signed in");
        Ok(user)
    }

    /// Sign out the current user. The cart is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Backend` if the provider fails.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.identity.sign_out().await?;
        clear_sentry_user();
        add_breadcrumb("auth", "Signed out", None);
        tracing::info!("User signed out");
        Ok(())
    }
}

/// Validate password requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is shorter than 6 characters.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, Table};

    struct Fixture {
        identity: MemoryIdentity,
        store: MemoryStore,
        cache: ProfileCache,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                identity: MemoryIdentity::new(),
                store: MemoryStore::new(),
                cache: ProfileCache::new(),
            }
        }

        fn service(&self) -> AuthService<'_> {
            AuthService::new(&self.identity, &self.store, &self.cache)
        }
    }

    #[test]
    fn test_validate_password_too_short() {
        assert!(matches!(
            validate_password("12345"),
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[test]
    fn test_validate_password_valid() {
        assert!(validate_password("123456").is_ok());
    }

    #[tokio::test]
    async fn test_sign_up_normalizes_and_creates_profile() {
        let fx = Fixture::new();
        let user = fx
            .service()
            .sign_up("  Ada@Example.COM ", "hunter22", None)
            .await
            .unwrap();

        assert_eq!(user.email.as_ref().unwrap().as_str(), "ada@example.com");
        assert_eq!(user.display_name.as_deref(), Some("ada"));

        let rows = fx.store.rows(Table::UserProfiles);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["display_name"], "ada");
        assert_eq!(fx.service().current_user().await, Some(user));
    }

    #[tokio::test]
    async fn test_sign_up_existing_email() {
        let fx = Fixture::new();
        fx.service()
            .sign_up("ada@example.com", "hunter22", Some("Ada"))
            .await
            .unwrap();

        let err = fx
            .service()
            .sign_up("ADA@example.com", "another1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));
    }

    #[tokio::test]
    async fn test_sign_up_profile_failure_is_not_fatal() {
        let fx = Fixture::new();
        fx.store.inject_failure(Table::UserProfiles);

        let user = fx
            .service()
            .sign_up("ada@example.com", "hunter22", Some("Ada"))
            .await;
        assert!(user.is_ok());
    }

    #[tokio::test]
    async fn test_sign_up_requiring_confirmation() {
        let fx = Fixture::new();
        fx.identity.require_confirmation(true);

        let err = fx
            .service()
            .sign_up("ada@example.com", "hunter22", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ConfirmationRequired));
        assert_eq!(fx.store.rows(Table::UserProfiles).len(), 1);
        assert!(fx.service().current_user().await.is_none());

        let err = fx
            .service()
            .sign_in("ada@example.com", "hunter22")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailNotConfirmed));
    }

    #[tokio::test]
    async fn test_sign_up_rejects_bad_input() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.service().sign_up("not-an-email", "hunter22", None).await,
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(matches!(
            fx.service().sign_up("ada@example.com", "123", None).await,
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[tokio::test]
    async fn test_sign_in_and_out() {
        let fx = Fixture::new();
        fx.service()
            .sign_up("ada@example.com", "hunter22", None)
            .await
            .unwrap();
        fx.service().sign_out().await.unwrap();
        assert!(matches!(
            fx.service().require_user().await,
            Err(AuthError::NotSignedIn)
        ));

        assert!(matches!(
            fx.service().sign_in("ada@example.com", "wrong-pass").await,
            Err(AuthError::InvalidCredentials)
        ));

        let user = fx
            .service()
            .sign_in(" ADA@example.com", "hunter22")
            .await
            .unwrap();
        assert_eq!(fx.service().require_user().await.unwrap(), user);
    }
}
