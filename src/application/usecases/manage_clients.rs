use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    errors::DomainError,
    models::Client,
    repositories::{CampaignRepository, ClientRepository},
};

pub struct ClientRequest {
    pub email: String,
    pub display_name: Option<String>,
    pub comment: Option<String>,
    pub owner_id: Option<Uuid>,
}

pub struct ClientsUseCase {
    repo: Arc<dyn ClientRepository>,
    campaigns: Arc<dyn CampaignRepository>,
}

impl ClientsUseCase {
    pub fn new(repo: Arc<dyn ClientRepository>, campaigns: Arc<dyn CampaignRepository>) -> Self {
        Self { repo, campaigns }
    }

    pub async fn create(&self, request: ClientRequest) -> anyhow::Result<Client> {
        validate_email(&request.email)?;
        let client = Client::new(
            request.email,
            request.display_name,
            request.comment,
            request.owner_id,
        );
        self.repo.create(&client).await?;
        Ok(client)
    }

    pub async fn get(&self, id: Uuid) -> anyhow::Result<Client> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("client {id}")).into())
    }

    pub async fn list(&self) -> anyhow::Result<Vec<Client>> {
        self.repo.list().await
    }

    pub async fn update(&self, id: Uuid, request: ClientRequest) -> anyhow::Result<Client> {
        validate_email(&request.email)?;
        let mut client = self.get(id).await?;
        client.email = request.email.trim().to_string();
        client.display_name = request.display_name;
        client.comment = request.comment;
        client.updated_at = Utc::now();
        self.repo.update(&client).await?;
        Ok(client)
    }

    /// Also drops the client from every campaign that is still being edited.
    pub async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        self.repo.delete(id).await?;
        let detached = self.campaigns.detach_recipient(id, Utc::now()).await?;
        tracing::info!(client_id = %id, detached, "client deleted");
        Ok(())
    }
}

fn validate_email(email: &str) -> Result<(), DomainError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(DomainError::Validation(format!("invalid e-mail {email:?}"))),
    }
}
