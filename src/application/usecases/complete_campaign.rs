use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    application::services::active_runs::ActiveRuns,
    domain::{
        errors::{DomainError, StateError},
        models::{Campaign, CampaignStatus},
        repositories::CampaignRepository,
    },
};

/// Closes a launched campaign whose run could not reach every recipient.
pub struct CompleteCampaignUseCase {
    repo: Arc<dyn CampaignRepository>,
    active_runs: ActiveRuns,
}

impl CompleteCampaignUseCase {
    pub fn new(repo: Arc<dyn CampaignRepository>, active_runs: ActiveRuns) -> Self {
        Self { repo, active_runs }
    }

    /// A rejected transition surfaces as a [`StateError`] inside the returned error.
    /// Refused with [`StateError::RunInProgress`] while a run still owns the campaign.
    pub async fn execute(&self, campaign_id: Uuid) -> anyhow::Result<Campaign> {
        let Some(_claim) = self.active_runs.claim(campaign_id) else {
            return Err(StateError::RunInProgress.into());
        };

        let mut campaign = self
            .repo
            .get(campaign_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("campaign {campaign_id}")))?;

        campaign.complete(Utc::now())?;

        if !self
            .repo
            .transition(&campaign, CampaignStatus::Launched)
            .await?
        {
            // Someone else completed it between our read and write.
            return Err(StateError::AlreadyCompleted.into());
        }

        tracing::info!(%campaign_id, "campaign completed manually");
        Ok(campaign)
    }
}
