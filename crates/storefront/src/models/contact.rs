//! Contact form messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gtm_shop_core::{ContactMessageId, Email};

use super::{FieldError, required};

/// A row of the `contact_messages` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ContactMessageId>,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ContactMessage {
    /// Validate form input into a new message.
    ///
    /// Every field is trimmed and required; the email is normalized.
    ///
    /// # Errors
    ///
    /// Returns `FieldError` naming the first blank field, or
    /// `FieldError::InvalidEmail` if the email is malformed.
    pub fn new(name: &str, email: &str, subject: &str, message: &str) -> Result<Self, FieldError> {
        let name = required("name", name)?;
        let email = Email::parse_normalized(&required("email", email)?)?;

        Ok(Self {
            id: None,
            name,
            email: email.into_inner(),
            subject: required("subject", subject)?,
            message: required("message", message)?,
            created_at: None,
        })
    }
}
