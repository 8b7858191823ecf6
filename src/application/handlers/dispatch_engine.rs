use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    application::services::{
        active_runs::{ActiveRuns, RunClaim},
        attempt_log::AttemptLog,
        transport::{MailConnection, MailTransport, TransportError},
    },
    domain::{
        errors::StateError,
        models::{AttemptOutcome, Campaign, CampaignStatus, Client},
        repositories::{CampaignRepository, ClientRepository, MessageRepository},
        value_objects::{MessageSnapshot, OutboundEmail},
    },
};

#[derive(Debug, Clone, Copy)]
pub struct DispatchConfig {
    /// Upper bound of sends in flight for one run. 1 sends sequentially.
    pub concurrency: usize,
    pub send_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            send_timeout: Duration::from_secs(30),
        }
    }
}

/// Errors that stop a run before any message is sent.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("campaign {0} not found")]
    CampaignNotFound(Uuid),
    #[error("message of campaign {0} not found")]
    MessageNotFound(Uuid),
    #[error("recipient {recipient_id} of campaign {campaign_id} not found")]
    RecipientNotFound { campaign_id: Uuid, recipient_id: Uuid },
    #[error(transparent)]
    State(#[from] StateError),
    #[error("mail transport unavailable: {0}")]
    TransportUnavailable(#[source] TransportError),
    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub campaign_id: Uuid,
    pub run_id: Uuid,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Sends whose attempt row could not be written.
    pub unrecorded: usize,
    pub completed: bool,
}

impl DispatchReport {
    fn new(campaign_id: Uuid, run_id: Uuid) -> Self {
        Self {
            campaign_id,
            run_id,
            attempted: 0,
            succeeded: 0,
            failed: 0,
            unrecorded: 0,
            completed: false,
        }
    }

    pub fn degraded(&self) -> bool {
        self.unrecorded > 0
    }

    fn absorb(&mut self, delivered: Delivered) {
        self.attempted += 1;
        match delivered.outcome {
            AttemptOutcome::Success => self.succeeded += 1,
            AttemptOutcome::Failure => self.failed += 1,
        }
        if !delivered.recorded {
            self.unrecorded += 1;
        }
    }
}

#[derive(Clone)]
pub struct DispatchEngine {
    campaigns: Arc<dyn CampaignRepository>,
    clients: Arc<dyn ClientRepository>,
    messages: Arc<dyn MessageRepository>,
    attempts: AttemptLog,
    transport: Arc<dyn MailTransport>,
    config: DispatchConfig,
    active_runs: ActiveRuns,
}

impl DispatchEngine {
    pub fn new(
        campaigns: Arc<dyn CampaignRepository>,
        clients: Arc<dyn ClientRepository>,
        messages: Arc<dyn MessageRepository>,
        attempts: AttemptLog,
        transport: Arc<dyn MailTransport>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            campaigns,
            clients,
            messages,
            attempts,
            transport,
            config,
            active_runs: ActiveRuns::new(),
        }
    }

    /// Campaigns this engine is launching or sending. Operations that must not
    /// overlap a run claim from the same registry.
    pub fn active_runs(&self) -> &ActiveRuns {
        &self.active_runs
    }

    pub async fn run(&self, campaign_id: Uuid) -> Result<DispatchReport, DispatchError> {
        let run = self.prepare(campaign_id).await?;
        Ok(run.execute().await)
    }

    /// Loads everything the run needs, acquires the transport connection and moves
    /// the campaign to `Launched`. Nothing is sent and no attempt is recorded when
    /// this fails.
    #[tracing::instrument(skip(self), fields(transport = self.transport.name()))]
    pub async fn prepare(&self, campaign_id: Uuid) -> Result<PreparedRun, DispatchError> {
        let campaign = self
            .campaigns
            .get(campaign_id)
            .await?
            .ok_or(DispatchError::CampaignNotFound(campaign_id))?;

        campaign.ensure_launchable()?;

        let Some(claim) = self.active_runs.claim(campaign_id) else {
            let rejection = self.rejection(campaign_id, StateError::AlreadyLaunched).await?;
            tracing::warn!(%rejection, "campaign is owned by another operation");
            return Err(rejection.into());
        };

        let message_id = campaign
            .message_id
            .ok_or(DispatchError::MessageNotFound(campaign_id))?;
        let message = self
            .messages
            .get(message_id)
            .await?
            .ok_or(DispatchError::MessageNotFound(campaign_id))?;

        let ids: Vec<Uuid> = campaign.recipient_ids.iter().copied().collect();
        let recipients = self.clients.get_many(&ids).await?;
        let found: HashSet<Uuid> = recipients.iter().map(|client| client.id).collect();
        if let Some(missing) = ids.iter().find(|id| !found.contains(id)) {
            return Err(DispatchError::RecipientNotFound {
                campaign_id,
                recipient_id: *missing,
            });
        }

        let connection: Arc<dyn MailConnection> = Arc::from(
            self.transport
                .connect()
                .await
                .map_err(DispatchError::TransportUnavailable)?,
        );

        let mut launched = campaign.clone();
        launched.launch(Utc::now())?;
        if !self
            .campaigns
            .transition(&launched, CampaignStatus::Created)
            .await?
        {
            let rejection = self
                .rejection(campaign_id, StateError::ChangedDuringLaunch)
                .await?;
            tracing::warn!(%rejection, "campaign changed before it could be launched");
            return Err(rejection.into());
        }

        let run = PreparedRun {
            run_id: Uuid::new_v4(),
            campaign: launched,
            snapshot: MessageSnapshot::from(&message),
            recipients,
            connection,
            attempts: self.attempts.clone(),
            campaigns: Arc::clone(&self.campaigns),
            config: self.config,
            claim,
        };
        tracing::info!(
            run_id = %run.run_id,
            recipients = run.recipients.len(),
            "campaign launched"
        );
        Ok(run)
    }

    /// Why the campaign cannot be launched now, read from its stored state.
    /// `fallback` applies when the stored campaign still looks launchable.
    async fn rejection(
        &self,
        campaign_id: Uuid,
        fallback: StateError,
    ) -> Result<StateError, DispatchError> {
        let current = self
            .campaigns
            .get(campaign_id)
            .await?
            .ok_or(DispatchError::CampaignNotFound(campaign_id))?;
        Ok(current.ensure_launchable().err().unwrap_or(fallback))
    }
}

/// A launched campaign waiting to be sent. Owns the transport connection and the
/// campaign's claim in [`ActiveRuns`]; both are released when the run finishes or
/// when the value is dropped unexecuted.
pub struct PreparedRun {
    run_id: Uuid,
    campaign: Campaign,
    snapshot: MessageSnapshot,
    recipients: Vec<Client>,
    connection: Arc<dyn MailConnection>,
    attempts: AttemptLog,
    campaigns: Arc<dyn CampaignRepository>,
    config: DispatchConfig,
    claim: RunClaim,
}

impl PreparedRun {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn campaign(&self) -> &Campaign {
        &self.campaign
    }

    pub fn recipient_count(&self) -> usize {
        self.recipients.len()
    }

    #[tracing::instrument(
        name = "dispatch_run",
        skip(self),
        fields(campaign_id = %self.campaign.id, run_id = %self.run_id)
    )]
    pub async fn execute(self) -> DispatchReport {
        let PreparedRun {
            run_id,
            campaign,
            snapshot,
            recipients,
            connection,
            attempts,
            campaigns,
            config,
            claim,
        } = self;

        let total = recipients.len();
        let campaign = Arc::new(campaign);
        let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
        let mut tasks = JoinSet::new();
        let mut report = DispatchReport::new(campaign.id, run_id);

        for recipient in recipients {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            let email = OutboundEmail::new(&recipient.email, &snapshot);
            let connection = Arc::clone(&connection);
            let attempts = attempts.clone();
            let campaign = Arc::clone(&campaign);
            let timeout = config.send_timeout;

            tasks.spawn(
                async move {
                    let _permit = permit;
                    deliver(
                        connection.as_ref(),
                        &attempts,
                        &campaign,
                        run_id,
                        &recipient,
                        email,
                        timeout,
                    )
                    .await
                }
                .in_current_span(),
            );
        }

        let mut returned = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(delivered) => {
                    returned += 1;
                    report.absorb(delivered);
                }
                Err(err) => tracing::error!(error = %err, "recipient send task aborted"),
            }
        }
        drop(connection);

        if returned == total {
            report.completed = complete(campaigns.as_ref(), &campaign).await;
        } else {
            tracing::warn!(
                returned,
                total,
                "run did not cover every recipient, campaign stays launched"
            );
        }
        drop(claim);

        tracing::info!(
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed,
            unrecorded = report.unrecorded,
            completed = report.completed,
            "dispatch run finished"
        );
        report
    }
}

struct Delivered {
    outcome: AttemptOutcome,
    recorded: bool,
}

async fn deliver(
    connection: &dyn MailConnection,
    attempts: &AttemptLog,
    campaign: &Campaign,
    run_id: Uuid,
    recipient: &Client,
    email: OutboundEmail,
    timeout: Duration,
) -> Delivered {
    let result = match tokio::time::timeout(timeout, connection.send(&email)).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout),
    };

    let (outcome, diagnostic) = match result {
        Ok(reply) => {
            tracing::debug!(recipient = %email.to, "message sent");
            (AttemptOutcome::Success, reply)
        }
        Err(err) => {
            tracing::warn!(recipient = %email.to, error = %err, "message delivery failed");
            (AttemptOutcome::Failure, err.to_string())
        }
    };

    let recorded = match attempts
        .record(campaign, run_id, recipient, outcome, diagnostic)
        .await
    {
        Ok(_) => true,
        Err(err) => {
            tracing::error!(
                recipient = %email.to,
                error = %err,
                "failed to record delivery attempt"
            );
            false
        }
    };

    Delivered { outcome, recorded }
}

async fn complete(campaigns: &dyn CampaignRepository, campaign: &Campaign) -> bool {
    let mut finished = campaign.clone();
    if let Err(err) = finished.complete(Utc::now()) {
        tracing::warn!(error = %err, "campaign cannot be completed");
        return false;
    }
    match campaigns
        .transition(&finished, CampaignStatus::Launched)
        .await
    {
        Ok(true) => true,
        Ok(false) => {
            tracing::warn!("campaign status changed during the run, completion skipped");
            false
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to persist campaign completion");
            false
        }
    }
}
