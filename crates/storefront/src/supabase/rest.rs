//! PostgREST-backed [`RemoteStore`].

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::instrument;
use url::Url;

use super::{SupabaseClient, SupabaseError};
use crate::db::{Direction, Filter, Query, RemoteStore, RepositoryError, Table};

/// Remote store backed by the project's REST endpoint (`/rest/v1/{table}`).
#[derive(Debug, Clone)]
pub struct SupabaseRest {
    client: SupabaseClient,
}

impl SupabaseRest {
    /// Create a store that shares `client`'s session.
    #[must_use]
    pub const fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    fn table_url(&self, table: Table) -> Result<Url, RepositoryError> {
        Ok(self.client.endpoint(&format!("/rest/v1/{}", table.as_str()))?)
    }
}

/// Append PostgREST query parameters for `query`.
fn apply_query(url: &mut Url, query: &Query) {
    let mut pairs = url.query_pairs_mut();
    pairs.append_pair("select", "*");
    for filter in &query.filters {
        pairs.append_pair(&filter.column, &format!("eq.{}", filter.value));
    }
    if let Some((column, direction)) = &query.order {
        let dir = match direction {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        };
        pairs.append_pair("order", &format!("{column}.{dir}"));
    }
    if let Some(limit) = query.limit {
        pairs.append_pair("limit", &limit.to_string());
    }
}

fn apply_filters(url: &mut Url, filters: &[Filter]) {
    let mut pairs = url.query_pairs_mut();
    for filter in filters {
        pairs.append_pair(&filter.column, &format!("eq.{}", filter.value));
    }
}

fn map_error(error: SupabaseError) -> RepositoryError {
    if error.is_unique_violation() {
        return RepositoryError::Conflict(error.to_string());
    }
    RepositoryError::Backend(error)
}

#[async_trait]
impl RemoteStore for SupabaseRest {
    #[instrument(skip(self, row))]
    async fn insert(&self, table: Table, row: Value) -> Result<Value, RepositoryError> {
        let url = self.table_url(table)?;
        let request = self
            .client
            .request(Method::POST, url)
            .header("Prefer", "return=representation")
            .json(&row);

        let rows: Vec<Value> = self.client.send_json(request).await.map_err(map_error)?;
        rows.into_iter().next().ok_or(RepositoryError::NotFound)
    }

    #[instrument(skip(self))]
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>, RepositoryError> {
        let mut url = self.table_url(table)?;
        apply_query(&mut url, query);

        let request = self.client.request(Method::GET, url);
        self.client.send_json(request).await.map_err(map_error)
    }

    #[instrument(skip(self, patch))]
    async fn update(
        &self,
        table: Table,
        filters: &[Filter],
        patch: Value,
    ) -> Result<Vec<Value>, RepositoryError> {
        let mut url = self.table_url(table)?;
        apply_filters(&mut url, filters);

        let request = self
            .client
            .request(Method::PATCH, url)
            .header("Prefer", "return=representation")
            .json(&patch);
        self.client.send_json(request).await.map_err(map_error)
    }
}
