//! Contact message repository.

use tracing::instrument;

use super::{RemoteStore, RepositoryError, Table};
use crate::models::ContactMessage;

/// Repository for the `contact_messages` table.
pub struct ContactRepository<'a> {
    store: &'a dyn RemoteStore,
}

impl<'a> ContactRepository<'a> {
    /// Create a new contact repository.
    #[must_use]
    pub const fn new(store: &'a dyn RemoteStore) -> Self {
        Self { store }
    }

    /// Store a contact message.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the insert fails.
    #[instrument(skip(self, message), fields(subject = %message.subject))]
    pub async fn create(&self, message: &ContactMessage) -> Result<ContactMessage, RepositoryError> {
        let row = self
            .store
            .insert(Table::ContactMessages, serde_json::to_value(message)?)
            .await?;
        tracing::info!("Contact message stored");
        Ok(serde_json::from_value(row)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[tokio::test]
    async fn test_create_assigns_id() {
        let store = MemoryStore::new();
        let repo = ContactRepository::new(&store);
        let message =
            ContactMessage::new("Ada", "ada@example.com", "Sizing", "Do tees run small?").unwrap();

        let stored = repo.create(&message).await.unwrap();
        assert!(stored.id.is_some());
        assert!(stored.created_at.is_some());
        assert_eq!(stored.subject, "Sizing");
        assert_eq!(store.rows(Table::ContactMessages).len(), 1);
    }
}
