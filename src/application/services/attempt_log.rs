use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    models::{AttemptOutcome, Campaign, Client, DeliveryAttempt},
    repositories::{AttemptRepository, Pagination},
};

/// Append-only record of delivery outcomes.
#[derive(Clone)]
pub struct AttemptLog {
    repo: Arc<dyn AttemptRepository>,
}

impl AttemptLog {
    pub fn new(repo: Arc<dyn AttemptRepository>) -> Self {
        Self { repo }
    }

    pub async fn record(
        &self,
        campaign: &Campaign,
        run_id: Uuid,
        recipient: &Client,
        outcome: AttemptOutcome,
        diagnostic: String,
    ) -> anyhow::Result<Uuid> {
        let attempt = DeliveryAttempt {
            id: Uuid::new_v4(),
            campaign_id: campaign.id,
            run_id,
            recipient_id: recipient.id,
            recipient_email: recipient.email.clone(),
            attempted_at: Utc::now(),
            outcome,
            transport_response: diagnostic,
            owner_id: campaign.owner_id,
        };
        self.repo.insert(&attempt).await?;
        Ok(attempt.id)
    }

    pub async fn get(&self, id: Uuid) -> anyhow::Result<Option<DeliveryAttempt>> {
        self.repo.get(id).await
    }

    pub async fn list(
        &self,
        campaign_id: Option<Uuid>,
        pagination: Pagination,
    ) -> anyhow::Result<(Vec<DeliveryAttempt>, bool)> {
        self.repo.list(campaign_id, pagination).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::infrastructure::repositories::in_memory::InMemoryAttemptRepository;

    #[tokio::test]
    async fn recorded_attempt_is_readable_with_same_fields() {
        let log = AttemptLog::new(Arc::new(InMemoryAttemptRepository::new()));
        let mut campaign = Campaign::new(None, BTreeSet::new(), Some(Uuid::new_v4()));
        campaign.id = Uuid::new_v4();
        let recipient = Client::new("a@example.com".into(), None, None, None);
        let run_id = Uuid::new_v4();

        let id = log
            .record(
                &campaign,
                run_id,
                &recipient,
                AttemptOutcome::Failure,
                "550 mailbox unavailable".into(),
            )
            .await
            .unwrap();

        let stored = log.get(id).await.unwrap().unwrap();
        assert_eq!(stored.campaign_id, campaign.id);
        assert_eq!(stored.run_id, run_id);
        assert_eq!(stored.recipient_id, recipient.id);
        assert_eq!(stored.outcome, AttemptOutcome::Failure);
        assert_eq!(stored.transport_response, "550 mailbox unavailable");
        assert_eq!(stored.owner_id, campaign.owner_id);

        let (listed, has_more) = log
            .list(Some(campaign.id), Pagination::default())
            .await
            .unwrap();
        assert_eq!(listed, vec![stored]);
        assert!(!has_more);
    }
}
