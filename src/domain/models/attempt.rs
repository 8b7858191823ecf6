use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Failure,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::Failure => "failure",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "success" => Some(AttemptOutcome::Success),
            "failure" => Some(AttemptOutcome::Failure),
            _ => None,
        }
    }
}

/// One recipient send within one dispatch run. Never updated after insert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryAttempt {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub run_id: Uuid,
    pub recipient_id: Uuid,
    pub recipient_email: String,
    pub attempted_at: DateTime<Utc>,
    pub outcome: AttemptOutcome,
    pub transport_response: String,
    pub owner_id: Option<Uuid>,
}
