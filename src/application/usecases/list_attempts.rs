use std::sync::Arc;

use uuid::Uuid;

use crate::{
    application::services::attempt_log::AttemptLog,
    domain::{
        errors::DomainError,
        models::DeliveryAttempt,
        repositories::{CampaignRepository, Pagination},
    },
};

pub struct PaginatedAttempts {
    pub attempts: Vec<DeliveryAttempt>,
    pub has_more: bool,
    pub next_offset: Option<u32>,
}

pub struct ListAttemptsUseCase {
    log: AttemptLog,
    campaigns: Arc<dyn CampaignRepository>,
}

impl ListAttemptsUseCase {
    pub fn new(log: AttemptLog, campaigns: Arc<dyn CampaignRepository>) -> Self {
        Self { log, campaigns }
    }

    pub async fn execute(
        &self,
        campaign_id: Option<Uuid>,
        pagination: Pagination,
    ) -> anyhow::Result<PaginatedAttempts> {
        if let Some(id) = campaign_id {
            if self.campaigns.get(id).await?.is_none() {
                return Err(DomainError::NotFound(format!("campaign {id}")).into());
            }
        }

        let (attempts, has_more) = self.log.list(campaign_id, pagination).await?;
        let next_offset = has_more.then(|| pagination.offset() + attempts.len() as u32);

        Ok(PaginatedAttempts {
            attempts,
            has_more,
            next_offset,
        })
    }

    pub async fn get(&self, attempt_id: Uuid) -> anyhow::Result<DeliveryAttempt> {
        self.log
            .get(attempt_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("attempt {attempt_id}")).into())
    }
}
