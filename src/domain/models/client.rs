use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Mailing recipient. The e-mail address is unique across the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Client {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub comment: Option<String>,
    pub owner_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    pub fn new(
        email: String,
        display_name: Option<String>,
        comment: Option<String>,
        owner_id: Option<Uuid>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.trim().to_string(),
            display_name,
            comment,
            owner_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Key used for the uniqueness check.
    pub fn normalized_email(&self) -> String {
        normalize_email(&self.email)
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
