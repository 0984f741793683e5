//! User profile repository with a read-through cache.

use std::time::Duration;

use moka::future::Cache;
use serde_json::Value;
use tracing::instrument;

use gtm_shop_core::UserId;

use super::{Filter, Query, RemoteStore, RepositoryError, Table, now_timestamp, single};
use crate::models::{ProfileUpdate, UserProfile};

/// Cached profiles, shared across repository instances.
///
/// Entries live for 5 minutes and are replaced on every write.
#[derive(Clone)]
pub struct ProfileCache {
    profiles: Cache<UserId, UserProfile>,
}

impl Default for ProfileCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            profiles: Cache::builder()
                .max_capacity(1000)
                .time_to_live(Duration::from_secs(300)) // 5 minutes
                .build(),
        }
    }

    /// Drop the cached profile for `user_id`.
    pub async fn invalidate(&self, user_id: &UserId) {
        self.profiles.invalidate(user_id).await;
    }
}

/// Repository for the `user_profiles` table.
pub struct ProfileRepository<'a> {
    store: &'a dyn RemoteStore,
    cache: &'a ProfileCache,
}

fn by_user(user_id: UserId) -> Vec<Filter> {
    vec![Filter {
        column: "user_id".to_string(),
        value: user_id.to_string(),
    }]
}

impl<'a> ProfileRepository<'a> {
    /// Create a new profile repository.
    #[must_use]
    pub const fn new(store: &'a dyn RemoteStore, cache: &'a ProfileCache) -> Self {
        Self { store, cache }
    }

    /// Create the profile for a user, or return the existing one.
    ///
    /// Safe to call repeatedly: an existing profile is returned unchanged, and
    /// a concurrent insert that wins the unique constraint is re-read.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend fails.
    #[instrument(skip(self, email, display_name))]
    pub async fn create(
        &self,
        user_id: UserId,
        email: &str,
        display_name: Option<&str>,
    ) -> Result<UserProfile, RepositoryError> {
        if let Some(existing) = self.fetch(user_id).await? {
            tracing::debug!("Profile already exists, skipping creation");
            return Ok(existing);
        }

        let profile = UserProfile::new(user_id, email, display_name.map(String::from));
        let profile = match self
            .store
            .insert(Table::UserProfiles, serde_json::to_value(&profile)?)
            .await
        {
            Ok(row) => serde_json::from_value(row)?,
            Err(RepositoryError::Conflict(_)) => {
                tracing::debug!("Profile created concurrently, fetching existing");
                self.fetch(user_id).await?.ok_or(RepositoryError::NotFound)?
            }
            Err(e) => return Err(e),
        };

        self.cache.profiles.insert(user_id, profile.clone()).await;
        Ok(profile)
    }

    /// Get a user's profile, if one exists.
    ///
    /// Served from the cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backend fails.
    #[instrument(skip(self))]
    pub async fn get(&self, user_id: UserId) -> Result<Option<UserProfile>, RepositoryError> {
        if let Some(profile) = self.cache.profiles.get(&user_id).await {
            return Ok(Some(profile));
        }

        let profile = self.fetch(user_id).await?;
        if let Some(profile) = &profile {
            self.cache.profiles.insert(user_id, profile.clone()).await;
        }
        Ok(profile)
    }

    /// Apply a partial update and return the new profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no profile.
    #[instrument(skip(self, update))]
    pub async fn update(
        &self,
        user_id: UserId,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, RepositoryError> {
        self.cache.invalidate(&user_id).await;

        let mut patch = serde_json::to_value(update)?;
        if let Value::Object(fields) = &mut patch {
            fields.insert("updated_at".into(), now_timestamp());
        }

        let profile: UserProfile = single(
            self.store
                .update(Table::UserProfiles, &by_user(user_id), patch)
                .await?,
        )?;

        self.cache.profiles.insert(user_id, profile.clone()).await;
        tracing::info!("Profile updated");
        Ok(profile)
    }

    async fn fetch(&self, user_id: UserId) -> Result<Option<UserProfile>, RepositoryError> {
        let query = Query::new().eq("user_id", user_id).limit(1);
        let rows = self.store.select(Table::UserProfiles, &query).await?;
        match single(rows) {
            Ok(profile) => Ok(Some(profile)),
            Err(RepositoryError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::db::MemoryStore;

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let store = MemoryStore::new();
        let cache = ProfileCache::new();
        let repo = ProfileRepository::new(&store, &cache);
        let user = UserId::random();

        let first = repo.create(user, "ada@example.com", Some("Ada")).await.unwrap();
        let second = repo.create(user, "other@example.com", Some("Other")).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second.display_name.as_deref(), Some("Ada"));
        assert_eq!(store.rows(Table::UserProfiles).len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = MemoryStore::new();
        let cache = ProfileCache::new();
        let repo = ProfileRepository::new(&store, &cache);
        assert!(repo.get(UserId::random()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_is_served_from_cache() {
        let store = MemoryStore::new();
        let cache = ProfileCache::new();
        let repo = ProfileRepository::new(&store, &cache);
        let user = UserId::random();
        repo.create(user, "ada@example.com", None).await.unwrap();

        store.inject_failure(Table::UserProfiles);
        let cached = repo.get(user).await.unwrap().unwrap();
        assert_eq!(cached.email, "ada@example.com");
    }

    #[tokio::test]
    async fn test_update_refreshes_cache() {
        let store = MemoryStore::new();
        let cache = ProfileCache::new();
        let repo = ProfileRepository::new(&store, &cache);
        let user = UserId::random();
        repo.create(user, "ada@example.com", Some("Ada")).await.unwrap();
        repo.get(user).await.unwrap();

        let update = ProfileUpdate {
            city: Some("Lisbon".to_string()),
            ..ProfileUpdate::default()
        };
        let updated = repo.update(user, &update).await.unwrap();
        assert_eq!(updated.city.as_deref(), Some("Lisbon"));
        assert_eq!(updated.display_name.as_deref(), Some("Ada"));
        assert!(updated.updated_at.is_some());

        let fetched = repo.get(user).await.unwrap().unwrap();
        assert_eq!(fetched.city.as_deref(), Some("Lisbon"));
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = MemoryStore::new();
        let cache = ProfileCache::new();
        let repo = ProfileRepository::new(&store, &cache);
        let result = repo.update(UserId::random(), &ProfileUpdate::default()).await;
        assert!(matches!(result, Err(RepositoryError::NotFound)));
    }

    #[tokio::test]
    async fn test_create_returns_row_written_elsewhere() {
        let store = MemoryStore::new();
        let cache = ProfileCache::new();
        let user = UserId::random();

        store
            .insert(
                Table::UserProfiles,
                json!({"user_id": user.to_string(), "email": "first@example.com"}),
            )
            .await
            .unwrap();

        let repo = ProfileRepository::new(&store, &cache);
        let profile = repo.create(user, "second@example.com", None).await.unwrap();
        assert_eq!(profile.email, "first@example.com");
    }
}
