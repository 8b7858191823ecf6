use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::models::{Campaign, CampaignStatus, Client, DeliveryAttempt, Message};

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 200;

#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl Pagination {
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: Some(DEFAULT_PAGE_SIZE),
            offset: Some(0),
        }
    }
}

/// `update` and `delete` fail with [`DomainError::NotFound`](crate::domain::errors::DomainError)
/// for unknown ids; `create` fails with `AlreadyExists` on a duplicate e-mail.
#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn create(&self, client: &Client) -> anyhow::Result<()>;
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Client>>;
    /// Returns the clients that exist; missing ids are silently skipped.
    async fn get_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Client>>;
    async fn update(&self, client: &Client) -> anyhow::Result<()>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<()>;
    async fn list(&self) -> anyhow::Result<Vec<Client>>;
    async fn count(&self) -> anyhow::Result<u64>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create(&self, message: &Message) -> anyhow::Result<()>;
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Message>>;
    async fn update(&self, message: &Message) -> anyhow::Result<()>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<()>;
    async fn list(&self) -> anyhow::Result<Vec<Message>>;
}

#[async_trait]
pub trait CampaignRepository: Send + Sync {
    async fn create(&self, campaign: &Campaign) -> anyhow::Result<()>;
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Campaign>>;
    /// Writes only the disabling flag, in any status. Fails with `NotFound` for
    /// unknown ids.
    async fn set_disabled(&self, id: Uuid, disabled: bool, at: DateTime<Utc>)
    -> anyhow::Result<()>;
    /// Replaces the recipients while the stored campaign is still `Created`.
    /// Returns whether the write happened.
    async fn set_recipients(
        &self,
        id: Uuid,
        recipient_ids: &BTreeSet<Uuid>,
        at: DateTime<Utc>,
    ) -> anyhow::Result<bool>;
    /// Same contract as [`set_recipients`](Self::set_recipients) for the message.
    async fn set_message(&self, id: Uuid, message_id: Uuid, at: DateTime<Utc>)
    -> anyhow::Result<bool>;
    /// Removes the client from every `Created` campaign; later statuses keep the
    /// id. Returns the number of campaigns changed.
    async fn detach_recipient(&self, client_id: Uuid, at: DateTime<Utc>) -> anyhow::Result<u64>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<()>;
    async fn list(&self) -> anyhow::Result<Vec<Campaign>>;
    async fn count_by_status(&self, status: Option<CampaignStatus>) -> anyhow::Result<u64>;

    /// Persists `campaign.status` and its shipment timestamps only if the stored
    /// status still equals `expected`. Moving into `Launched` additionally requires
    /// the stored campaign not to be disabled and to still carry the message and
    /// recipients of `campaign`. Returns whether the write happened.
    async fn transition(&self, campaign: &Campaign, expected: CampaignStatus)
    -> anyhow::Result<bool>;
}

#[async_trait]
pub trait AttemptRepository: Send + Sync {
    async fn insert(&self, attempt: &DeliveryAttempt) -> anyhow::Result<()>;
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<DeliveryAttempt>>;

    /// Newest first. The flag tells whether more rows follow the page.
    async fn list(
        &self,
        campaign_id: Option<Uuid>,
        pagination: Pagination,
    ) -> anyhow::Result<(Vec<DeliveryAttempt>, bool)>;
}
