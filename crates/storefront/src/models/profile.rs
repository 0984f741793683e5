//! User profile records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gtm_shop_core::UserId;

/// A row of the `user_profiles` table. One per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// A fresh profile with only identity fields set.
    #[must_use]
    pub fn new(user_id: UserId, email: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
            display_name,
            phone: None,
            address: None,
            city: None,
            state: None,
            zip_code: None,
            country: None,
            created_at: None,
            updated_at: None,
        }
    }
}

/// Partial update of the editable profile fields.
///
/// `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl ProfileUpdate {
    /// Whether the update changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The same update without its display name.
    #[must_use]
    pub fn without_display_name(mut self) -> Self {
        self.display_name = None;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_update_serializes_only_set_fields() {
        let update = ProfileUpdate {
            city: Some("Lisbon".to_string()),
            ..ProfileUpdate::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({"city": "Lisbon"})
        );
        assert!(!update.is_empty());
        assert!(ProfileUpdate::default().is_empty());
    }

    #[test]
    fn test_profile_parses_sparse_row() {
        let row = serde_json::json!({
            "id": 7,
            "user_id": "11111111-2222-4333-8444-555555555555",
            "email": "ada@example.com",
            "display_name": null
        });
        let profile: UserProfile = serde_json::from_value(row).unwrap();
        assert_eq!(profile.email, "ada@example.com");
        assert!(profile.display_name.is_none());
        assert!(profile.country.is_none());
    }
}
