//! GoTrue-backed [`IdentityProvider`].
//!
//! The session is mirrored into the `@gtm_session` storage slot so it
//! survives restarts. On startup the slot is read back, and an expired access
//! token is exchanged for a fresh one using the refresh token.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use gtm_shop_core::{Email, UserId};

use super::{SupabaseClient, SupabaseError};
use crate::models::{AuthUser, Session};
use crate::services::auth::{AuthError, IdentityProvider, SignUpOutcome};
use crate::storage::{KeyValueStorage, SESSION_STORAGE_KEY};

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct UserBody {
    id: UserId,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Value,
    #[serde(default)]
    identities: Option<Vec<Value>>,
}

impl UserBody {
    fn into_user(self) -> AuthUser {
        AuthUser {
            id: self.id,
            email: self.email.as_deref().and_then(|e| Email::parse(e).ok()),
            display_name: self
                .user_metadata
                .get("display_name")
                .and_then(Value::as_str)
                .map(String::from),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SessionBody {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: UserBody,
}

impl SessionBody {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .unwrap_or_else(|| Utc::now() + Duration::seconds(self.expires_in.unwrap_or(3600)));

        Session {
            access_token: SecretString::from(self.access_token),
            refresh_token: SecretString::from(self.refresh_token),
            expires_at,
            user: self.user.into_user(),
        }
    }
}

/// Session as persisted in the storage slot.
#[derive(Serialize, Deserialize)]
struct StoredSession {
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
    user_id: UserId,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

impl From<&Session> for StoredSession {
    fn from(session: &Session) -> Self {
        Self {
            access_token: session.access_token.expose_secret().to_string(),
            refresh_token: session.refresh_token.expose_secret().to_string(),
            expires_at: session.expires_at,
            user_id: session.user.id,
            email: session.user.email.as_ref().map(|e| e.as_str().to_string()),
            display_name: session.user.display_name.clone(),
        }
    }
}

impl From<StoredSession> for Session {
    fn from(stored: StoredSession) -> Self {
        Self {
            access_token: SecretString::from(stored.access_token),
            refresh_token: SecretString::from(stored.refresh_token),
            expires_at: stored.expires_at,
            user: AuthUser {
                id: stored.user_id,
                email: stored.email.as_deref().and_then(|e| Email::parse(e).ok()),
                display_name: stored.display_name,
            },
        }
    }
}

/// Map a provider failure onto the typed auth errors.
fn map_error(error: SupabaseError) -> AuthError {
    let code = error.code().unwrap_or_default().to_string();
    let message = match &error {
        SupabaseError::Api { message, .. } => message.to_lowercase(),
        _ => String::new(),
    };

    if code == "invalid_credentials" || message.contains("invalid login credentials") {
        AuthError::InvalidCredentials
    } else if code == "email_not_confirmed" || message.contains("email not confirmed") {
        AuthError::EmailNotConfirmed
    } else if code == "user_already_exists" || message.contains("already registered") {
        AuthError::UserAlreadyExists
    } else if code == "weak_password" {
        AuthError::WeakPassword(message)
    } else {
        AuthError::Backend(error)
    }
}

// =============================================================================
// SupabaseAuth
// =============================================================================

/// Identity provider backed by the project's auth endpoints.
#[derive(Clone)]
pub struct SupabaseAuth {
    inner: Arc<SupabaseAuthInner>,
}

struct SupabaseAuthInner {
    client: SupabaseClient,
    storage: Arc<dyn KeyValueStorage>,
    session: Mutex<Option<Session>>,
    email_redirect_url: Option<String>,
}

impl SupabaseAuth {
    /// Create the provider and restore any persisted session.
    ///
    /// A missing, unreadable, or unrefreshable session leaves the user signed
    /// out; restoration never fails.
    pub async fn restore(
        client: SupabaseClient,
        storage: Arc<dyn KeyValueStorage>,
        email_redirect_url: Option<String>,
    ) -> Self {
        let auth = Self {
            inner: Arc::new(SupabaseAuthInner {
                client,
                storage,
                session: Mutex::new(None),
                email_redirect_url,
            }),
        };

        let stored = match auth.inner.storage.get(SESSION_STORAGE_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<StoredSession>(&raw) {
                Ok(stored) => Some(Session::from(stored)),
                Err(e) => {
                    tracing::warn!(error = %e, "Discarding unreadable session");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Error loading session");
                None
            }
        };

        match stored {
            Some(session) if session.is_expired() => match auth.refresh(&session).await {
                Ok(fresh) => auth.install(fresh).await,
                Err(e) => {
                    tracing::info!(error = %e, "Stored session could not be refreshed");
                    auth.forget().await;
                }
            },
            Some(session) => auth.install(session).await,
            None => {}
        }

        auth
    }

    fn session(&self) -> MutexGuard<'_, Option<Session>> {
        self.inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn token_url(&self, grant_type: &str) -> Result<url::Url, SupabaseError> {
        let mut url = self.inner.client.endpoint("/auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);
        Ok(url)
    }

    #[instrument(skip_all)]
    async fn refresh(&self, session: &Session) -> Result<Session, SupabaseError> {
        let request = self
            .inner
            .client
            .request(Method::POST, self.token_url("refresh_token")?)
            .json(&json!({ "refresh_token": session.refresh_token.expose_secret() }));

        let body: SessionBody = self.inner.client.send_json(request).await?;
        tracing::debug!("Session refreshed");
        Ok(body.into_session())
    }

    /// Make `session` current and persist it.
    async fn install(&self, session: Session) {
        self.inner
            .client
            .set_access_token(session.access_token.clone());

        match serde_json::to_string(&StoredSession::from(&session)) {
            Ok(raw) => {
                if let Err(e) = self.inner.storage.set(SESSION_STORAGE_KEY, &raw).await {
                    tracing::warn!(error = %e, "Failed to persist session");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to serialize session"),
        }

        *self.session() = Some(session);
    }

    /// Drop the current session locally.
    async fn forget(&self) {
        self.inner.client.clear_access_token();
        *self.session() = None;
        if let Err(e) = self.inner.storage.remove(SESSION_STORAGE_KEY).await {
            tracing::warn!(error = %e, "Failed to remove persisted session");
        }
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuth {
    async fn current_user(&self) -> Option<AuthUser> {
        self.session().as_ref().map(|s| s.user.clone())
    }

    #[instrument(skip(self, email, password, display_name))]
    async fn sign_up(
        &self,
        email: &Email,
        password: &str,
        display_name: &str,
    ) -> Result<SignUpOutcome, AuthError> {
        let mut url = self.inner.client.endpoint("/auth/v1/signup")?;
        if let Some(redirect) = &self.inner.email_redirect_url {
            url.query_pairs_mut().append_pair("redirect_to", redirect);
        }

        let request = self.inner.client.request(Method::POST, url).json(&json!({
            "email": email.as_str(),
            "password": password,
            "data": { "display_name": display_name },
        }));
        let body: Value = self
            .inner
            .client
            .send_json(request)
            .await
            .map_err(map_error)?;

        // With auto-confirm the response is a session; otherwise it is the bare user.
        if body.get("access_token").is_some() {
            let session = serde_json::from_value::<SessionBody>(body)
                .map_err(SupabaseError::from)?
                .into_session();
            let user = session.user.clone();
            self.install(session).await;
            return Ok(SignUpOutcome::SignedIn(user));
        }

        let user: UserBody = serde_json::from_value(body).map_err(SupabaseError::from)?;
        if user.identities.as_ref().is_some_and(Vec::is_empty) {
            return Ok(SignUpOutcome::AlreadyRegistered);
        }
        Ok(SignUpOutcome::ConfirmationRequired(user.into_user()))
    }

    #[instrument(skip(self, email, password))]
    async fn sign_in(&self, email: &Email, password: &str) -> Result<AuthUser, AuthError> {
        let request = self
            .inner
            .client
            .request(Method::POST, self.token_url("password")?)
            .json(&json!({ "email": email.as_str(), "password": password }));

        let body: SessionBody = self
            .inner
            .client
            .send_json(request)
            .await
            .map_err(map_error)?;

        let session = body.into_session();
        let user = session.user.clone();
        self.install(session).await;
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn sign_out(&self) -> Result<(), AuthError> {
        if !self.inner.client.has_access_token() {
            self.forget().await;
            return Ok(());
        }

        let url = self.inner.client.endpoint("/auth/v1/logout")?;
        let request = self.inner.client.request(Method::POST, url);
        if let Err(e) = self.inner.client.send_empty(request).await {
            // The local session is dropped regardless; the token expires on its own.
            tracing::warn!(error = %e, "Remote sign-out failed");
        }

        self.forget().await;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use url::Url;

    use super::*;
    use crate::config::SupabaseConfig;
    use crate::storage::MemoryStorage;

    fn client() -> SupabaseClient {
        SupabaseClient::new(&SupabaseConfig {
            url: Url::parse("https://abc.supabase.co").unwrap(),
            anon_key: SecretString::from("anon"),
            payment_function: "process-payment".to_string(),
            email_redirect_url: None,
        })
    }

    fn stored(expires_at: DateTime<Utc>) -> String {
        serde_json::to_string(&StoredSession {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at,
            user_id: UserId::random(),
            email: Some("ada@example.com".to_string()),
            display_name: Some("Ada".to_string()),
        })
        .unwrap()
    }

    #[test]
    fn test_session_body_parses_gotrue_response() {
        let body = json!({
            "access_token": "jwt",
            "token_type": "bearer",
            "expires_in": 3600,
            "expires_at": 4_102_444_800_i64,
            "refresh_token": "r1",
            "user": {
                "id": "11111111-2222-4333-8444-555555555555",
                "email": "ada@example.com",
                "user_metadata": { "display_name": "Ada" },
                "identities": [{}]
            }
        });
        let session = serde_json::from_value::<SessionBody>(body)
            .unwrap()
            .into_session();
        assert_eq!(session.user.display_name.as_deref(), Some("Ada"));
        assert_eq!(session.expires_at.timestamp(), 4_102_444_800);
        assert!(!session.is_expired());
    }

    #[test]
    fn test_map_error_known_cases() {
        let api = |code: Option<&str>, message: &str| SupabaseError::Api {
            status: 400,
            code: code.map(String::from),
            message: message.to_string(),
        };

        assert!(matches!(
            map_error(api(None, "Invalid login credentials")),
            AuthError::InvalidCredentials
        ));
        assert!(matches!(
            map_error(api(Some("email_not_confirmed"), "Email not confirmed")),
            AuthError::EmailNotConfirmed
        ));
        assert!(matches!(
            map_error(api(None, "User already registered")),
            AuthError::UserAlreadyExists
        ));
        assert!(matches!(
            map_error(api(Some("unexpected_failure"), "boom")),
            AuthError::Backend(_)
        ));
    }

    #[tokio::test]
    async fn test_restore_valid_session() {
        let storage = MemoryStorage::new();
        storage.insert(SESSION_STORAGE_KEY, stored(Utc::now() + Duration::hours(1)));

        let client = client();
        let auth = SupabaseAuth::restore(client.clone(), Arc::new(storage), None).await;

        let user = auth.current_user().await.unwrap();
        assert_eq!(user.display_name.as_deref(), Some("Ada"));
        assert!(client.has_access_token());
    }

    #[tokio::test]
    async fn test_restore_discards_corrupt_session() {
        let storage = MemoryStorage::new();
        storage.insert(SESSION_STORAGE_KEY, "{oops");

        let auth = SupabaseAuth::restore(client(), Arc::new(storage), None).await;
        assert!(auth.current_user().await.is_none());
    }

    #[tokio::test]
    async fn test_sign_out_without_session_clears_slot() {
        let storage = MemoryStorage::new();
        let auth = SupabaseAuth::restore(client(), Arc::new(storage.clone()), None).await;

        auth.sign_out().await.unwrap();
        assert!(!storage.contains(SESSION_STORAGE_KEY));
    }
}
