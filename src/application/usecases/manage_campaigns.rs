use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    application::services::active_runs::ActiveRuns,
    domain::{
        errors::{DomainError, StateError},
        models::Campaign,
        repositories::{CampaignRepository, ClientRepository, MessageRepository},
    },
};

pub struct CreateCampaignRequest {
    pub message_id: Option<Uuid>,
    pub recipient_ids: Vec<Uuid>,
    pub disabled: bool,
    pub owner_id: Option<Uuid>,
}

pub struct CampaignsUseCase {
    campaigns: Arc<dyn CampaignRepository>,
    clients: Arc<dyn ClientRepository>,
    messages: Arc<dyn MessageRepository>,
    active_runs: ActiveRuns,
}

impl CampaignsUseCase {
    pub fn new(
        campaigns: Arc<dyn CampaignRepository>,
        clients: Arc<dyn ClientRepository>,
        messages: Arc<dyn MessageRepository>,
        active_runs: ActiveRuns,
    ) -> Self {
        Self {
            campaigns,
            clients,
            messages,
            active_runs,
        }
    }

    pub async fn create(&self, request: CreateCampaignRequest) -> anyhow::Result<Campaign> {
        if let Some(message_id) = request.message_id {
            self.ensure_message_exists(message_id).await?;
        }
        let recipients = self.resolve_recipients(&request.recipient_ids).await?;

        let mut campaign = Campaign::new(request.message_id, recipients, request.owner_id);
        campaign.disabled = request.disabled;
        self.campaigns.create(&campaign).await?;
        Ok(campaign)
    }

    pub async fn get(&self, id: Uuid) -> anyhow::Result<Campaign> {
        self.campaigns
            .get(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("campaign {id}")).into())
    }

    pub async fn list(&self) -> anyhow::Result<Vec<Campaign>> {
        self.campaigns.list().await
    }

    pub async fn set_recipients(
        &self,
        id: Uuid,
        recipient_ids: Vec<Uuid>,
    ) -> anyhow::Result<Campaign> {
        self.get_editable(id).await?;
        let recipients = self.resolve_recipients(&recipient_ids).await?;
        if !self.campaigns.set_recipients(id, &recipients, Utc::now()).await? {
            return Err(self.not_editable(id).await);
        }
        self.get(id).await
    }

    pub async fn set_message(&self, id: Uuid, message_id: Uuid) -> anyhow::Result<Campaign> {
        self.get_editable(id).await?;
        self.ensure_message_exists(message_id).await?;
        if !self.campaigns.set_message(id, message_id, Utc::now()).await? {
            return Err(self.not_editable(id).await);
        }
        self.get(id).await
    }

    /// Allowed in every status; a disabled campaign refuses further launches.
    pub async fn set_disabled(&self, id: Uuid, disabled: bool) -> anyhow::Result<Campaign> {
        self.campaigns.set_disabled(id, disabled, Utc::now()).await?;
        tracing::info!(campaign_id = %id, disabled, "campaign disabling flag changed");
        self.get(id).await
    }

    /// Refused with [`StateError::RunInProgress`] while a run owns the campaign.
    pub async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        let Some(_claim) = self.active_runs.claim(id) else {
            return Err(StateError::RunInProgress.into());
        };
        self.campaigns.delete(id).await
    }

    async fn get_editable(&self, id: Uuid) -> anyhow::Result<Campaign> {
        let campaign = self.get(id).await?;
        if !campaign.is_editable() {
            return Err(forbidden(&campaign));
        }
        Ok(campaign)
    }

    /// Error for a conditional edit that found the campaign launched or gone.
    async fn not_editable(&self, id: Uuid) -> anyhow::Error {
        match self.get(id).await {
            Ok(campaign) => forbidden(&campaign),
            Err(err) => err,
        }
    }

    async fn ensure_message_exists(&self, message_id: Uuid) -> anyhow::Result<()> {
        if self.messages.get(message_id).await?.is_none() {
            return Err(DomainError::NotFound(format!("message {message_id}")).into());
        }
        Ok(())
    }

    async fn resolve_recipients(&self, ids: &[Uuid]) -> anyhow::Result<BTreeSet<Uuid>> {
        let requested: BTreeSet<Uuid> = ids.iter().copied().collect();
        let ids: Vec<Uuid> = requested.iter().copied().collect();
        let found: BTreeSet<Uuid> = self
            .clients
            .get_many(&ids)
            .await?
            .into_iter()
            .map(|client| client.id)
            .collect();
        if let Some(missing) = requested.difference(&found).next() {
            return Err(DomainError::NotFound(format!("client {missing}")).into());
        }
        Ok(requested)
    }
}

fn forbidden(campaign: &Campaign) -> anyhow::Error {
    DomainError::Forbidden(format!(
        "campaign {} is {} and can no longer be edited",
        campaign.id,
        campaign.status.as_str()
    ))
    .into()
}
