//! In-process identity provider.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use gtm_shop_core::{Email, UserId};

use super::{AuthError, IdentityProvider, SignUpOutcome};
use crate::models::AuthUser;

#[derive(Debug)]
struct Account {
    user: AuthUser,
    password: String,
    confirmed: bool,
}

#[derive(Debug, Default)]
struct MemoryIdentityInner {
    accounts: Mutex<HashMap<String, Account>>,
    current: Mutex<Option<AuthUser>>,
    require_confirmation: Mutex<bool>,
}

/// Identity provider keeping accounts in memory.
///
/// Cheap to clone; clones share accounts and the current session.
#[derive(Debug, Clone, Default)]
pub struct MemoryIdentity {
    inner: Arc<MemoryIdentityInner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryIdentity {
    /// Creates a provider with no accounts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require email confirmation for new sign-ups.
    pub fn require_confirmation(&self, required: bool) {
        *lock(&self.inner.require_confirmation) = required;
    }

    /// Mark an account's email as confirmed.
    pub fn confirm(&self, email: &Email) {
        if let Some(account) = lock(&self.inner.accounts).get_mut(email.as_str()) {
            account.confirmed = true;
        }
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn current_user(&self) -> Option<AuthUser> {
        lock(&self.inner.current).clone()
    }

    async fn sign_up(
        &self,
        email: &Email,
        password: &str,
        display_name: &str,
    ) -> Result<SignUpOutcome, AuthError> {
        let mut accounts = lock(&self.inner.accounts);
        if accounts.contains_key(email.as_str()) {
            return Ok(SignUpOutcome::AlreadyRegistered);
        }

        let user = AuthUser {
            id: UserId::random(),
            email: Some(email.clone()),
            display_name: Some(display_name.to_string()),
        };
        let confirmed = !*lock(&self.inner.require_confirmation);
        accounts.insert(
            email.as_str().to_string(),
            Account {
                user: user.clone(),
                password: password.to_string(),
                confirmed,
            },
        );

        if confirmed {
            *lock(&self.inner.current) = Some(user.clone());
            Ok(SignUpOutcome::SignedIn(user))
        } else {
            Ok(SignUpOutcome::ConfirmationRequired(user))
        }
    }

    async fn sign_in(&self, email: &Email, password: &str) -> Result<AuthUser, AuthError> {
        let accounts = lock(&self.inner.accounts);
        let account = accounts
            .get(email.as_str())
            .filter(|a| a.password == password)
            .ok_or(AuthError::InvalidCredentials)?;

        if !account.confirmed {
            return Err(AuthError::EmailNotConfirmed);
        }

        *lock(&self.inner.current) = Some(account.user.clone());
        Ok(account.user.clone())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        *lock(&self.inner.current) = None;
        Ok(())
    }
}
