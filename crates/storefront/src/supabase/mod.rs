//! HTTP clients for the hosted backend (Supabase).
//!
//! # Architecture
//!
//! - One shared [`SupabaseClient`] holds the `reqwest` client, project URL,
//!   anon key, and the signed-in user's access token (if any)
//! - [`SupabaseRest`] implements [`RemoteStore`](crate::db::RemoteStore) over PostgREST
//! - [`SupabaseAuth`] implements [`IdentityProvider`](crate::services::auth::IdentityProvider)
//!   over the GoTrue endpoints
//! - [`EdgeFunctionGateway`] implements [`PaymentGateway`](crate::services::payment::PaymentGateway)
//!   over a deployed edge function
//!
//! Requests carry the anon key as `apikey`. The bearer token is the user's
//! access token when signed in, otherwise the anon key.

mod auth;
mod functions;
mod rest;

pub use auth::SupabaseAuth;
pub use functions::EdgeFunctionGateway;
pub use rest::SupabaseRest;

use std::sync::{Arc, PoisonError, RwLock};

use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::config::SupabaseConfig;

/// Postgres error code for a unique constraint violation.
pub const UNIQUE_VIOLATION: &str = "23505";

/// Errors that can occur when calling the hosted backend.
#[derive(Debug, Error)]
pub enum SupabaseError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Backend error code (Postgres SQLSTATE or auth error code).
        code: Option<String>,
        /// Human-readable message from the backend.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// A request URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl SupabaseError {
    /// Backend error code, if the response carried one.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// HTTP status, if the backend answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::RateLimited(_) => Some(429),
            _ => None,
        }
    }

    /// Whether this is a unique constraint violation.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        self.code() == Some(UNIQUE_VIOLATION)
    }
}

// =============================================================================
// SupabaseClient
// =============================================================================

/// Shared client for the hosted backend.
///
/// Cheap to clone; clones share the access token slot.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<SupabaseClientInner>,
}

struct SupabaseClientInner {
    client: reqwest::Client,
    base_url: Url,
    anon_key: SecretString,
    access_token: RwLock<Option<SecretString>>,
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("signed_in", &self.has_access_token())
            .finish_non_exhaustive()
    }
}

impl SupabaseClient {
    /// Create a new client for the configured project.
    #[must_use]
    pub fn new(config: &SupabaseConfig) -> Self {
        Self {
            inner: Arc::new(SupabaseClientInner {
                client: reqwest::Client::new(),
                base_url: config.url.clone(),
                anon_key: config.anon_key.clone(),
                access_token: RwLock::new(None),
            }),
        }
    }

    /// Project base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Use `token` as the bearer for subsequent requests.
    pub fn set_access_token(&self, token: SecretString) {
        *self
            .inner
            .access_token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    /// Fall back to the anon key as bearer.
    pub fn clear_access_token(&self) {
        *self
            .inner
            .access_token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Whether a user access token is set.
    #[must_use]
    pub fn has_access_token(&self) -> bool {
        self.inner
            .access_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Resolve `path` against the project URL.
    ///
    /// # Errors
    ///
    /// Returns `SupabaseError::InvalidUrl` if the path cannot be joined.
    pub fn endpoint(&self, path: &str) -> Result<Url, SupabaseError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| SupabaseError::InvalidUrl(format!("{path}: {e}")))
    }

    /// Start a request with the standard headers.
    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let bearer = self
            .inner
            .access_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or_else(
                || self.inner.anon_key.expose_secret().to_string(),
                |t| t.expose_secret().to_string(),
            );

        self.inner
            .client
            .request(method, url)
            .header("apikey", self.inner.anon_key.expose_secret())
            .bearer_auth(bearer)
    }

    /// Send a request and decode the JSON body.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, SupabaseError> {
        let text = Self::send(request).await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %truncate(&text, 500),
                "Failed to parse backend response"
            );
            SupabaseError::Parse(e)
        })
    }

    /// Send a request and discard the body.
    pub(crate) async fn send_empty(&self, request: RequestBuilder) -> Result<(), SupabaseError> {
        Self::send(request).await.map(|_| ())
    }

    async fn send(request: RequestBuilder) -> Result<String, SupabaseError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(SupabaseError::RateLimited(retry_after));
        }

        let text = response.text().await?;

        if !status.is_success() {
            tracing::warn!(
                status = %status,
                body = %truncate(&text, 500),
                "Backend returned non-success status"
            );
            return Err(api_error(status.as_u16(), &text));
        }

        Ok(text)
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Build an `Api` error from an error body.
///
/// PostgREST bodies look like `{code, message, details, hint}`; GoTrue bodies
/// use `{error_code, msg}` or `{error, error_description}`.
fn api_error(status: u16, body: &str) -> SupabaseError {
    let value: serde_json::Value = serde_json::from_str(body).unwrap_or_default();

    let field = |name: &str| {
        value.get(name).and_then(|v| match v {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    };

    let code = field("error_code").or_else(|| field("code"));
    let message = field("message")
        .or_else(|| field("msg"))
        .or_else(|| field("error_description"))
        .or_else(|| field("error"))
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("HTTP {status}")
            } else {
                truncate(body, 200)
            }
        });

    SupabaseError::Api {
        status,
        code,
        message,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> SupabaseClient {
        SupabaseClient::new(&SupabaseConfig {
            url: Url::parse("https://abc.supabase.co").unwrap(),
            anon_key: SecretString::from("anon"),
            payment_function: "process-payment".to_string(),
            email_redirect_url: None,
        })
    }

    #[test]
    fn test_endpoint_joins_path() {
        let url = client().endpoint("/rest/v1/orders").unwrap();
        assert_eq!(url.as_str(), "https://abc.supabase.co/rest/v1/orders");
    }

    #[test]
    fn test_access_token_slot_is_shared() {
        let a = client();
        let b = a.clone();
        a.set_access_token(SecretString::from("jwt"));
        assert!(b.has_access_token());
        b.clear_access_token();
        assert!(!a.has_access_token());
    }

    #[test]
    fn test_api_error_postgrest_body() {
        let err = api_error(
            409,
            r#"{"code":"23505","message":"duplicate key value","details":null,"hint":null}"#,
        );
        assert!(err.is_unique_violation());
        assert_eq!(err.status(), Some(409));
        assert_eq!(err.to_string(), "API error (409): duplicate key value");
    }

    #[test]
    fn test_api_error_gotrue_bodies() {
        let err = api_error(400, r#"{"code":400,"error_code":"email_not_confirmed","msg":"Email not confirmed"}"#);
        assert_eq!(err.code(), Some("email_not_confirmed"));
        assert_eq!(err.to_string(), "API error (400): Email not confirmed");

        let err = api_error(
            400,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert_eq!(err.to_string(), "API error (400): Invalid login credentials");
    }

    #[test]
    fn test_api_error_non_json_body() {
        assert_eq!(api_error(502, "").to_string(), "API error (502): HTTP 502");
        assert_eq!(
            api_error(500, "upstream exploded").to_string(),
            "API error (500): upstream exploded"
        );
    }

    #[test]
    fn test_rate_limited_error() {
        let err = SupabaseError::RateLimited(60);
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");
        assert_eq!(err.status(), Some(429));
    }
}
