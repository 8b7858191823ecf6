#![allow(dead_code)]

use std::collections::{BTreeSet, HashSet};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use mailing::{
    application::{
        handlers::dispatch_engine::{DispatchConfig, DispatchEngine},
        services::{
            attempt_log::AttemptLog,
            transport::{MailConnection, MailTransport, TransportError},
        },
    },
    domain::{
        models::{Campaign, Client, DeliveryAttempt, Message},
        repositories::{AttemptRepository, ClientRepository, Pagination},
        value_objects::OutboundEmail,
    },
    infrastructure::repositories::Stores,
};

#[derive(Default)]
pub struct TransportProbe {
    pub connects: AtomicUsize,
    pub live_connections: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub sent: Mutex<Vec<OutboundEmail>>,
}

impl TransportProbe {
    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn live(&self) -> usize {
        self.live_connections.load(Ordering::SeqCst)
    }
}

/// Transport whose behaviour per address is set up by the test.
#[derive(Default)]
pub struct ScriptedTransport {
    pub rejected: HashSet<String>,
    pub slow: HashSet<String>,
    pub slow_for: Duration,
    /// Added to every send so that runs overlap.
    pub latency: Duration,
    pub refuse_connect: bool,
    pub probe: Arc<TransportProbe>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(mut self, address: &str) -> Self {
        self.rejected.insert(address.to_string());
        self
    }

    pub fn slow(mut self, address: &str, delay: Duration) -> Self {
        self.slow.insert(address.to_string());
        self.slow_for = delay;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.refuse_connect = true;
        self
    }
}

#[async_trait]
impl MailTransport for ScriptedTransport {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn connect(&self) -> Result<Box<dyn MailConnection>, TransportError> {
        self.probe.connects.fetch_add(1, Ordering::SeqCst);
        if self.refuse_connect {
            return Err(TransportError::Connection("connection refused".into()));
        }
        self.probe.live_connections.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedConnection {
            rejected: self.rejected.clone(),
            slow: self.slow.clone(),
            slow_for: self.slow_for,
            latency: self.latency,
            probe: Arc::clone(&self.probe),
        }))
    }
}

struct ScriptedConnection {
    rejected: HashSet<String>,
    slow: HashSet<String>,
    slow_for: Duration,
    latency: Duration,
    probe: Arc<TransportProbe>,
}

#[async_trait]
impl MailConnection for ScriptedConnection {
    async fn send(&self, email: &OutboundEmail) -> Result<String, TransportError> {
        let now = self.probe.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.slow.contains(&email.to) {
            tokio::time::sleep(self.slow_for).await;
        }
        self.probe.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.rejected.contains(&email.to) {
            return Err(TransportError::Rejected("550 mailbox unavailable".into()));
        }
        self.probe.sent.lock().unwrap().push(email.clone());
        Ok("250 2.0.0 queued".into())
    }
}

impl Drop for ScriptedConnection {
    fn drop(&mut self) {
        self.probe.live_connections.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Attempt store that refuses every write.
pub struct BrokenAttemptRepository;

#[async_trait]
impl AttemptRepository for BrokenAttemptRepository {
    async fn insert(&self, _attempt: &DeliveryAttempt) -> anyhow::Result<()> {
        anyhow::bail!("attempt store is read-only")
    }

    async fn get(&self, _id: Uuid) -> anyhow::Result<Option<DeliveryAttempt>> {
        Ok(None)
    }

    async fn list(
        &self,
        _campaign_id: Option<Uuid>,
        _pagination: Pagination,
    ) -> anyhow::Result<(Vec<DeliveryAttempt>, bool)> {
        Ok((Vec::new(), false))
    }
}

/// Client store whose batch lookup stalls, holding callers between their read of a
/// campaign and their write.
pub struct SlowClientRepository {
    inner: Arc<dyn ClientRepository>,
    delay: Duration,
}

impl SlowClientRepository {
    pub fn wrap(stores: &Stores, delay: Duration) -> Stores {
        Stores {
            clients: Arc::new(Self {
                inner: Arc::clone(&stores.clients),
                delay,
            }),
            ..stores.clone()
        }
    }
}

#[async_trait]
impl ClientRepository for SlowClientRepository {
    async fn create(&self, client: &Client) -> anyhow::Result<()> {
        self.inner.create(client).await
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Client>> {
        self.inner.get(id).await
    }

    async fn get_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Client>> {
        tokio::time::sleep(self.delay).await;
        self.inner.get_many(ids).await
    }

    async fn update(&self, client: &Client) -> anyhow::Result<()> {
        self.inner.update(client).await
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        self.inner.delete(id).await
    }

    async fn list(&self) -> anyhow::Result<Vec<Client>> {
        self.inner.list().await
    }

    async fn count(&self) -> anyhow::Result<u64> {
        self.inner.count().await
    }
}

pub fn engine(
    stores: &Stores,
    transport: Arc<dyn MailTransport>,
    config: DispatchConfig,
) -> DispatchEngine {
    DispatchEngine::new(
        Arc::clone(&stores.campaigns),
        Arc::clone(&stores.clients),
        Arc::clone(&stores.messages),
        AttemptLog::new(Arc::clone(&stores.attempts)),
        transport,
        config,
    )
}

pub fn fast_config() -> DispatchConfig {
    DispatchConfig {
        concurrency: 4,
        send_timeout: Duration::from_secs(5),
    }
}

pub struct Seeded {
    pub campaign: Campaign,
    pub message: Message,
    pub clients: Vec<Client>,
}

pub async fn seed(stores: &Stores, emails: &[&str]) -> Seeded {
    seed_with(stores, emails, false).await
}

pub async fn seed_with(stores: &Stores, emails: &[&str], disabled: bool) -> Seeded {
    let message = Message::new("Spring sale".into(), "Everything is 20% off.".into(), None);
    stores.messages.create(&message).await.unwrap();

    let mut clients = Vec::new();
    for email in emails {
        let client = Client::new(email.to_string(), None, None, None);
        stores.clients.create(&client).await.unwrap();
        clients.push(client);
    }

    let recipients: BTreeSet<Uuid> = clients.iter().map(|client| client.id).collect();
    let mut campaign = Campaign::new(Some(message.id), recipients, None);
    campaign.disabled = disabled;
    stores.campaigns.create(&campaign).await.unwrap();

    Seeded {
        campaign,
        message,
        clients,
    }
}

pub async fn attempts_of(stores: &Stores, campaign_id: Uuid) -> Vec<DeliveryAttempt> {
    let (attempts, _) = stores
        .attempts
        .list(
            Some(campaign_id),
            Pagination {
                limit: Some(200),
                offset: Some(0),
            },
        )
        .await
        .unwrap();
    attempts
}
