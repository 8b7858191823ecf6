use std::sync::Arc;

use crate::domain::{
    models::CampaignStatus,
    repositories::{CampaignRepository, ClientRepository},
};

pub struct Summary {
    pub campaigns_total: u64,
    pub campaigns_launched: u64,
    pub clients_total: u64,
}

pub struct SummaryUseCase {
    campaigns: Arc<dyn CampaignRepository>,
    clients: Arc<dyn ClientRepository>,
}

impl SummaryUseCase {
    pub fn new(campaigns: Arc<dyn CampaignRepository>, clients: Arc<dyn ClientRepository>) -> Self {
        Self { campaigns, clients }
    }

    pub async fn execute(&self) -> anyhow::Result<Summary> {
        Ok(Summary {
            campaigns_total: self.campaigns.count_by_status(None).await?,
            campaigns_launched: self
                .campaigns
                .count_by_status(Some(CampaignStatus::Launched))
                .await?,
            clients_total: self.clients.count().await?,
        })
    }
}
