use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::StateError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Created,
    Launched,
    Completed,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Created => "created",
            CampaignStatus::Launched => "launched",
            CampaignStatus::Completed => "completed",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "created" => Some(CampaignStatus::Created),
            "launched" => Some(CampaignStatus::Launched),
            "completed" => Some(CampaignStatus::Completed),
            _ => None,
        }
    }
}

/// A mailing job: one message, a set of recipients and a forward-only lifecycle.
///
/// Transitions are computed here and persisted through
/// [`CampaignRepository::transition`](crate::domain::repositories::CampaignRepository::transition),
/// which re-checks the stored status so concurrent launches cannot both win.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Campaign {
    pub id: Uuid,
    pub message_id: Option<Uuid>,
    pub recipient_ids: BTreeSet<Uuid>,
    pub status: CampaignStatus,
    pub first_shipment_at: Option<DateTime<Utc>>,
    pub end_shipment_at: Option<DateTime<Utc>>,
    pub disabled: bool,
    pub owner_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    pub fn new(
        message_id: Option<Uuid>,
        recipient_ids: BTreeSet<Uuid>,
        owner_id: Option<Uuid>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            message_id,
            recipient_ids,
            status: CampaignStatus::Created,
            first_shipment_at: None,
            end_shipment_at: None,
            disabled: false,
            owner_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// The disabling flag wins over every status.
    pub fn ensure_launchable(&self) -> Result<(), StateError> {
        if self.disabled {
            return Err(StateError::Disabled);
        }
        match self.status {
            CampaignStatus::Created => Ok(()),
            CampaignStatus::Launched => Err(StateError::AlreadyLaunched),
            CampaignStatus::Completed => Err(StateError::AlreadyCompleted),
        }
    }

    pub fn launch(&mut self, at: DateTime<Utc>) -> Result<(), StateError> {
        self.ensure_launchable()?;
        self.status = CampaignStatus::Launched;
        if self.first_shipment_at.is_none() {
            self.first_shipment_at = Some(at);
        }
        self.updated_at = at;
        Ok(())
    }

    pub fn complete(&mut self, at: DateTime<Utc>) -> Result<(), StateError> {
        match self.status {
            CampaignStatus::Launched => {
                self.status = CampaignStatus::Completed;
                self.end_shipment_at = Some(at);
                self.updated_at = at;
                Ok(())
            }
            CampaignStatus::Created => Err(StateError::NotLaunched),
            CampaignStatus::Completed => Err(StateError::AlreadyCompleted),
        }
    }

    /// Recipients and message are frozen once the campaign leaves `Created`.
    pub fn is_editable(&self) -> bool {
        self.status == CampaignStatus::Created
    }
}
