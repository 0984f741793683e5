//! Remote data store access.
//!
//! # Tables
//!
//! - `orders` - Placed orders, one row per checkout
//! - `user_profiles` - One row per user, keyed by `user_id`
//! - `contact_messages` - Contact form submissions
//!
//! Rows travel as JSON objects through the [`RemoteStore`] trait. Typed
//! repositories sit on top and own the (de)serialization.

pub mod contact;
mod memory;
pub mod orders;
pub mod profiles;

pub use contact::ContactRepository;
pub use memory::MemoryStore;
pub use orders::OrderRepository;
pub use profiles::{ProfileCache, ProfileRepository};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::supabase::SupabaseError;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The backend rejected or failed the request.
    #[error("backend error: {0}")]
    Backend(#[from] SupabaseError),

    /// A row could not be decoded into its record type.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested row was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate `user_id`).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The store cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for RepositoryError {
    fn from(e: serde_json::Error) -> Self {
        Self::DataCorruption(e.to_string())
    }
}

/// Backend tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Orders,
    UserProfiles,
    ContactMessages,
}

impl Table {
    /// Table name on the backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Orders => "orders",
            Self::UserProfiles => "user_profiles",
            Self::ContactMessages => "contact_messages",
        }
    }

    /// Column with a unique constraint.
    #[must_use]
    pub const fn unique_column(self) -> &'static str {
        match self {
            Self::Orders | Self::ContactMessages => "id",
            Self::UserProfiles => "user_id",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Equality filter on a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

/// A row selection: equality filters, one ordering column, and a limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    /// Select every row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep rows where `column` equals `value`.
    #[must_use]
    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            value: value.to_string(),
        });
        self
    }

    /// Order by `column`.
    #[must_use]
    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        self.order = Some((column.to_string(), direction));
        self
    }

    /// Return at most `n` rows.
    #[must_use]
    pub const fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }
}

/// Row-level access to the backend tables.
///
/// Implementations return inserted and updated rows as stored (with
/// server-generated columns filled in).
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    /// Insert one row and return it.
    async fn insert(&self, table: Table, row: Value) -> Result<Value, RepositoryError>;

    /// Select rows matching `query`.
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>, RepositoryError>;

    /// Merge `patch` into every row matching `filters` and return the updated rows.
    async fn update(
        &self,
        table: Table,
        filters: &[Filter],
        patch: Value,
    ) -> Result<Vec<Value>, RepositoryError>;
}

/// Decode exactly one row, or `NotFound`.
pub(crate) fn single<T: serde::de::DeserializeOwned>(
    rows: Vec<Value>,
) -> Result<T, RepositoryError> {
    let row = rows.into_iter().next().ok_or(RepositoryError::NotFound)?;
    Ok(serde_json::from_value(row)?)
}

/// Current time as an RFC 3339 timestamp for `updated_at` columns.
pub(crate) fn now_timestamp() -> Value {
    Value::String(chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Nanos, true))
}
