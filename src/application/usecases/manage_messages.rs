use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{errors::DomainError, models::Message, repositories::MessageRepository};

pub struct MessageRequest {
    pub subject: String,
    pub body: String,
    pub owner_id: Option<Uuid>,
}

pub struct MessagesUseCase {
    repo: Arc<dyn MessageRepository>,
}

impl MessagesUseCase {
    pub fn new(repo: Arc<dyn MessageRepository>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, request: MessageRequest) -> anyhow::Result<Message> {
        let message = Message::new(request.subject, request.body, request.owner_id);
        self.repo.create(&message).await?;
        Ok(message)
    }

    pub async fn get(&self, id: Uuid) -> anyhow::Result<Message> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("message {id}")).into())
    }

    pub async fn list(&self) -> anyhow::Result<Vec<Message>> {
        self.repo.list().await
    }

    /// Runs already in flight keep the text they captured at launch.
    pub async fn update(&self, id: Uuid, request: MessageRequest) -> anyhow::Result<Message> {
        let mut message = self.get(id).await?;
        message.subject = request.subject;
        message.body = request.body;
        message.updated_at = Utc::now();
        self.repo.update(&message).await?;
        Ok(message)
    }

    pub async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        self.repo.delete(id).await
    }
}
