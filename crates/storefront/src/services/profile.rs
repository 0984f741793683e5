//! Profile editing for the signed-in user.

use thiserror::Error;
use tracing::instrument;

use super::auth::IdentityProvider;
use crate::db::{ProfileCache, ProfileRepository, RemoteStore, RepositoryError};
use crate::models::{AuthUser, FieldError, ProfileUpdate, UserProfile, required};

/// Errors that can occur while reading or saving a profile.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("sign in to manage your profile")]
    NotSignedIn,

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Profile service.
pub struct ProfileService<'a> {
    identity: &'a dyn IdentityProvider,
    profiles: ProfileRepository<'a>,
}

impl<'a> ProfileService<'a> {
    /// Create a new profile service.
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

    async fn user(&self) -> Result<AuthUser, ProfileError> {
        self.identity
            .current_user()
            .await
            .ok_or(ProfileError::NotSignedIn)
    }

    /// The signed-in user's profile, if one has been created.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::NotSignedIn` without a session, or
    /// `ProfileError::Repository` if the backend fails.
    pub async fn current(&self) -> Result<Option<UserProfile>, ProfileError> {
        let user = self.user().await?;
        Ok(self.profiles.get(user.id).await?)
    }

    /// Save the signed-in user's profile.
    ///
    /// The display name is required. A missing profile is created first,
    /// then the remaining fields are applied.
    ///
    /// # Errors
    ///
    /// Returns `FieldError::Missing("display_name")` if the name is blank.
    #[instrument(skip(self, display_name, update))]
    pub async fn save(
        &self,
        display_name: &str,
        update: ProfileUpdate,
    ) -> Result<UserProfile, ProfileError> {
        let user = self.user().await?;
        let display_name = required("display_name", display_name)?;

        if self.profiles.get(user.id).await?.is_some() {
            let update = ProfileUpdate {
                display_name: Some(display_name),
                ..update
            };
            return Ok(self.profiles.update(user.id, &update).await?);
        }

        let email = user.email.as_ref().map_or("", |e| e.as_str());
        let created = self
            .profiles
            .create(user.id, email, Some(&display_name))
            .await?;

        let rest = update.without_display_name();
        if rest.is_empty() {
            return Ok(created);
        }
        Ok(self.profiles.update(user.id, &rest).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gtm_shop_core::Email;

    use super::*;
    use crate::db::{MemoryStore, Table};
    use crate::services::auth::MemoryIdentity;

    async fn signed_in() -> MemoryIdentity {
        let identity = MemoryIdentity::new();
        identity
            .sign_up(&Email::parse("ada@example.com").unwrap(), "hunter22", "ada")
            .await
            .unwrap();
        identity
    }

    #[tokio::test]
    async fn test_save_creates_missing_profile() {
        let identity = signed_in().await;
        let store = MemoryStore::new();
        let cache = ProfileCache::new();
        let service = ProfileService::new(&identity, &store, &cache);

        let update = ProfileUpdate {
            city: Some("London".to_string()),
            ..ProfileUpdate::default()
        };
        let profile = service.save(" Ada ", update).await.unwrap();

        assert_eq!(profile.display_name.as_deref(), Some("Ada"));
        assert_eq!(profile.city.as_deref(), Some("London"));
        assert_eq!(profile.email, "ada@example.com");
        assert_eq!(store.rows(Table::UserProfiles).len(), 1);
    }

    #[tokio::test]
    async fn test_save_updates_existing_profile() {
        let identity = signed_in().await;
        let store = MemoryStore::new();
        let cache = ProfileCache::new();
        let service = ProfileService::new(&identity, &store, &cache);

        service.save("Ada", ProfileUpdate::default()).await.unwrap();
        let profile = service
            .save(
                "Countess",
                ProfileUpdate {
                    phone: Some("555-0100".to_string()),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(profile.display_name.as_deref(), Some("Countess"));
        assert_eq!(profile.phone.as_deref(), Some("555-0100"));
        assert_eq!(store.rows(Table::UserProfiles).len(), 1);
        assert_eq!(service.current().await.unwrap(), Some(profile));
    }

    #[tokio::test]
    async fn test_save_requires_display_name() {
        let identity = signed_in().await;
        let store = MemoryStore::new();
        let cache = ProfileCache::new();
        let service = ProfileService::new(&identity, &store, &cache);

        let err = service.save("  ", ProfileUpdate::default()).await.unwrap_err();
        assert!(matches!(
            err,
            ProfileError::Field(FieldError::Missing("display_name"))
        ));
    }

    #[tokio::test]
    async fn test_requires_session() {
        let identity = MemoryIdentity::new();
        let store = MemoryStore::new();
        let cache = ProfileCache::new();
        let service = ProfileService::new(&identity, &store, &cache);

        assert!(matches!(
            service.current().await,
            Err(ProfileError::NotSignedIn)
        ));
    }
}
