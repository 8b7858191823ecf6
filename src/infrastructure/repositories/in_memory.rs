use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    errors::DomainError,
    models::{Campaign, CampaignStatus, Client, DeliveryAttempt, Message},
    repositories::{
        AttemptRepository, CampaignRepository, ClientRepository, MessageRepository, Pagination,
    },
};

#[derive(Default)]
pub struct InMemoryClientRepository {
    clients: Arc<RwLock<HashMap<Uuid, Client>>>,
}

impl InMemoryClientRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_taken(clients: &HashMap<Uuid, Client>, candidate: &Client) -> bool {
    let email = candidate.normalized_email();
    clients
        .values()
        .any(|c| c.id != candidate.id && c.normalized_email() == email)
}

#[async_trait]
impl ClientRepository for InMemoryClientRepository {
    async fn create(&self, client: &Client) -> anyhow::Result<()> {
        let mut clients = self.clients.write().await;
        if email_taken(&clients, client) {
            return Err(DomainError::AlreadyExists(format!("client {}", client.email)).into());
        }
        clients.insert(client.id, client.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Client>> {
        let clients = self.clients.read().await;
        Ok(clients.get(&id).cloned())
    }

    async fn get_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Client>> {
        let clients = self.clients.read().await;
        Ok(ids.iter().filter_map(|id| clients.get(id).cloned()).collect())
    }

    async fn update(&self, client: &Client) -> anyhow::Result<()> {
        let mut clients = self.clients.write().await;
        if !clients.contains_key(&client.id) {
            return Err(DomainError::NotFound(format!("client {}", client.id)).into());
        }
        if email_taken(&clients, client) {
            return Err(DomainError::AlreadyExists(format!("client {}", client.email)).into());
        }
        clients.insert(client.id, client.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        let mut clients = self.clients.write().await;
        clients
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| DomainError::NotFound(format!("client {id}")).into())
    }

    async fn list(&self) -> anyhow::Result<Vec<Client>> {
        let clients = self.clients.read().await;
        let mut all: Vec<Client> = clients.values().cloned().collect();
        all.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(all)
    }

    async fn count(&self) -> anyhow::Result<u64> {
        Ok(self.clients.read().await.len() as u64)
    }
}

#[derive(Default)]
pub struct InMemoryMessageRepository {
    messages: Arc<RwLock<HashMap<Uuid, Message>>>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn create(&self, message: &Message) -> anyhow::Result<()> {
        let mut messages = self.messages.write().await;
        messages.insert(message.id, message.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Message>> {
        let messages = self.messages.read().await;
        Ok(messages.get(&id).cloned())
    }

    async fn update(&self, message: &Message) -> anyhow::Result<()> {
        let mut messages = self.messages.write().await;
        match messages.get_mut(&message.id) {
            Some(existing) => {
                *existing = message.clone();
                Ok(())
            }
            None => Err(DomainError::NotFound(format!("message {}", message.id)).into()),
        }
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        let mut messages = self.messages.write().await;
        messages
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| DomainError::NotFound(format!("message {id}")).into())
    }

    async fn list(&self) -> anyhow::Result<Vec<Message>> {
        let messages = self.messages.read().await;
        let mut all: Vec<Message> = messages.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }
}

#[derive(Default)]
pub struct InMemoryCampaignRepository {
    campaigns: Arc<RwLock<HashMap<Uuid, Campaign>>>,
}

impl InMemoryCampaignRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CampaignRepository for InMemoryCampaignRepository {
    async fn create(&self, campaign: &Campaign) -> anyhow::Result<()> {
        let mut campaigns = self.campaigns.write().await;
        campaigns.insert(campaign.id, campaign.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Campaign>> {
        let campaigns = self.campaigns.read().await;
        Ok(campaigns.get(&id).cloned())
    }

    async fn set_disabled(
        &self,
        id: Uuid,
        disabled: bool,
        at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut campaigns = self.campaigns.write().await;
        let stored = campaigns
            .get_mut(&id)
            .ok_or_else(|| DomainError::NotFound(format!("campaign {id}")))?;
        stored.disabled = disabled;
        stored.updated_at = at;
        Ok(())
    }

    async fn set_recipients(
        &self,
        id: Uuid,
        recipient_ids: &BTreeSet<Uuid>,
        at: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let mut campaigns = self.campaigns.write().await;
        match campaigns.get_mut(&id) {
            Some(stored) if stored.is_editable() => {
                stored.recipient_ids = recipient_ids.clone();
                stored.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_message(
        &self,
        id: Uuid,
        message_id: Uuid,
        at: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let mut campaigns = self.campaigns.write().await;
        match campaigns.get_mut(&id) {
            Some(stored) if stored.is_editable() => {
                stored.message_id = Some(message_id);
                stored.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn detach_recipient(&self, client_id: Uuid, at: DateTime<Utc>) -> anyhow::Result<u64> {
        let mut campaigns = self.campaigns.write().await;
        let mut changed = 0;
        for stored in campaigns.values_mut().filter(|c| c.is_editable()) {
            if stored.recipient_ids.remove(&client_id) {
                stored.updated_at = at;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        let mut campaigns = self.campaigns.write().await;
        campaigns
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| DomainError::NotFound(format!("campaign {id}")).into())
    }

    async fn list(&self) -> anyhow::Result<Vec<Campaign>> {
        let campaigns = self.campaigns.read().await;
        let mut all: Vec<Campaign> = campaigns.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn count_by_status(&self, status: Option<CampaignStatus>) -> anyhow::Result<u64> {
        let campaigns = self.campaigns.read().await;
        Ok(campaigns
            .values()
            .filter(|c| status.is_none_or(|s| c.status == s))
            .count() as u64)
    }

    async fn transition(
        &self,
        campaign: &Campaign,
        expected: CampaignStatus,
    ) -> anyhow::Result<bool> {
        let mut campaigns = self.campaigns.write().await;
        let Some(stored) = campaigns.get_mut(&campaign.id) else {
            return Ok(false);
        };
        let launching = campaign.status == CampaignStatus::Launched;
        if stored.status != expected
            || (launching
                && (stored.disabled
                    || stored.message_id != campaign.message_id
                    || stored.recipient_ids != campaign.recipient_ids))
        {
            return Ok(false);
        }
        stored.status = campaign.status;
        stored.first_shipment_at = stored.first_shipment_at.or(campaign.first_shipment_at);
        stored.end_shipment_at = campaign.end_shipment_at;
        stored.updated_at = campaign.updated_at;
        Ok(true)
    }
}

#[derive(Default)]
pub struct InMemoryAttemptRepository {
    attempts: Arc<RwLock<Vec<DeliveryAttempt>>>,
}

impl InMemoryAttemptRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AttemptRepository for InMemoryAttemptRepository {
    async fn insert(&self, attempt: &DeliveryAttempt) -> anyhow::Result<()> {
        let mut attempts = self.attempts.write().await;
        attempts.push(attempt.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<DeliveryAttempt>> {
        let attempts = self.attempts.read().await;
        Ok(attempts.iter().find(|a| a.id == id).cloned())
    }

    async fn list(
        &self,
        campaign_id: Option<Uuid>,
        pagination: Pagination,
    ) -> anyhow::Result<(Vec<DeliveryAttempt>, bool)> {
        let attempts = self.attempts.read().await;
        // Reverse first so equal timestamps come out newest-inserted first.
        let mut matching: Vec<DeliveryAttempt> = attempts
            .iter()
            .rev()
            .filter(|a| campaign_id.is_none_or(|id| a.campaign_id == id))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.attempted_at.cmp(&a.attempted_at));

        let limit = pagination.limit() as usize;
        let offset = pagination.offset() as usize;
        let has_more = matching.len() > offset + limit;
        let page = matching.into_iter().skip(offset).take(limit).collect();
        Ok((page, has_more))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::{Duration, Utc};

    use super::*;
    use crate::domain::models::AttemptOutcome;

    #[tokio::test]
    async fn duplicate_email_is_rejected_case_insensitively() {
        let repo = InMemoryClientRepository::new();
        repo.create(&Client::new("Anna@Example.com".into(), None, None, None))
            .await
            .unwrap();

        let err = repo
            .create(&Client::new(" anna@example.com ".into(), None, None, None))
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<DomainError>(),
            Some(DomainError::AlreadyExists(_))
        ));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn transition_only_applies_from_expected_status() {
        let repo = InMemoryCampaignRepository::new();
        let campaign = Campaign::new(None, BTreeSet::new(), None);
        repo.create(&campaign).await.unwrap();

        let mut launched = campaign.clone();
        launched.launch(Utc::now()).unwrap();

        assert!(repo.transition(&launched, CampaignStatus::Created).await.unwrap());
        assert!(!repo.transition(&launched, CampaignStatus::Created).await.unwrap());

        let stored = repo.get(campaign.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CampaignStatus::Launched);
        assert_eq!(stored.first_shipment_at, launched.first_shipment_at);
    }

    #[tokio::test]
    async fn transition_refuses_to_launch_a_disabled_campaign() {
        let repo = InMemoryCampaignRepository::new();
        let campaign = Campaign::new(None, BTreeSet::new(), None);
        repo.create(&campaign).await.unwrap();

        repo.set_disabled(campaign.id, true, Utc::now()).await.unwrap();

        // Computed from a stale read taken before the flag was set.
        let mut launched = campaign.clone();
        launched.launch(Utc::now()).unwrap();

        assert!(!repo.transition(&launched, CampaignStatus::Created).await.unwrap());
        let stored = repo.get(campaign.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CampaignStatus::Created);
    }

    #[tokio::test]
    async fn transition_refuses_to_launch_with_stale_recipients() {
        let repo = InMemoryCampaignRepository::new();
        let campaign = Campaign::new(None, BTreeSet::from([Uuid::new_v4()]), None);
        repo.create(&campaign).await.unwrap();

        let mut launched = campaign.clone();
        launched.launch(Utc::now()).unwrap();
        let replaced = BTreeSet::from([Uuid::new_v4()]);
        assert!(repo.set_recipients(campaign.id, &replaced, Utc::now()).await.unwrap());

        assert!(!repo.transition(&launched, CampaignStatus::Created).await.unwrap());
        let stored = repo.get(campaign.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CampaignStatus::Created);
        assert_eq!(stored.recipient_ids, replaced);
    }

    #[tokio::test]
    async fn edits_are_refused_once_launched_and_never_touch_status() {
        let repo = InMemoryCampaignRepository::new();
        let recipient = Uuid::new_v4();
        let campaign = Campaign::new(None, BTreeSet::from([recipient]), None);
        repo.create(&campaign).await.unwrap();
        let mut launched = campaign.clone();
        launched.launch(Utc::now()).unwrap();
        repo.transition(&launched, CampaignStatus::Created).await.unwrap();

        assert!(!repo.set_recipients(campaign.id, &BTreeSet::new(), Utc::now()).await.unwrap());
        assert!(!repo.set_message(campaign.id, Uuid::new_v4(), Utc::now()).await.unwrap());
        assert_eq!(repo.detach_recipient(recipient, Utc::now()).await.unwrap(), 0);
        repo.set_disabled(campaign.id, true, Utc::now()).await.unwrap();

        let stored = repo.get(campaign.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CampaignStatus::Launched);
        assert_eq!(stored.recipient_ids, BTreeSet::from([recipient]));
        assert!(stored.message_id.is_none());
        assert!(stored.disabled);
    }

    #[tokio::test]
    async fn detach_recipient_only_changes_created_campaigns() {
        let repo = InMemoryCampaignRepository::new();
        let recipient = Uuid::new_v4();
        let other = Uuid::new_v4();
        let draft = Campaign::new(None, BTreeSet::from([recipient, other]), None);
        let untouched = Campaign::new(None, BTreeSet::from([other]), None);
        repo.create(&draft).await.unwrap();
        repo.create(&untouched).await.unwrap();

        assert_eq!(repo.detach_recipient(recipient, Utc::now()).await.unwrap(), 1);

        let stored = repo.get(draft.id).await.unwrap().unwrap();
        assert_eq!(stored.recipient_ids, BTreeSet::from([other]));
    }

    fn attempt(campaign_id: Uuid, at: chrono::DateTime<Utc>) -> DeliveryAttempt {
        DeliveryAttempt {
            id: Uuid::new_v4(),
            campaign_id,
            run_id: Uuid::new_v4(),
            recipient_id: Uuid::new_v4(),
            recipient_email: "r@example.com".into(),
            attempted_at: at,
            outcome: AttemptOutcome::Success,
            transport_response: String::new(),
            owner_id: None,
        }
    }

    #[tokio::test]
    async fn attempts_are_listed_newest_first_and_paginated() {
        let repo = InMemoryAttemptRepository::new();
        let campaign_id = Uuid::new_v4();
        let now = Utc::now();
        let oldest = attempt(campaign_id, now - Duration::seconds(20));
        let middle = attempt(campaign_id, now - Duration::seconds(10));
        let newest = attempt(campaign_id, now);
        let other = attempt(Uuid::new_v4(), now);
        for a in [&middle, &oldest, &other, &newest] {
            repo.insert(a).await.unwrap();
        }

        let (page, has_more) = repo
            .list(
                Some(campaign_id),
                Pagination {
                    limit: Some(2),
                    offset: Some(0),
                },
            )
            .await
            .unwrap();
        assert_eq!(page, vec![newest.clone(), middle.clone()]);
        assert!(has_more);

        let (page, has_more) = repo
            .list(
                Some(campaign_id),
                Pagination {
                    limit: Some(2),
                    offset: Some(2),
                },
            )
            .await
            .unwrap();
        assert_eq!(page, vec![oldest]);
        assert!(!has_more);

        let (all, _) = repo.list(None, Pagination::default()).await.unwrap();
        assert_eq!(all.len(), 4);
    }
}
