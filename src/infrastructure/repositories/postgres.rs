use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Pool, Postgres, Row};
use uuid::Uuid;

use crate::domain::{
    errors::DomainError,
    models::{AttemptOutcome, Campaign, CampaignStatus, Client, DeliveryAttempt, Message},
    repositories::{
        AttemptRepository, CampaignRepository, ClientRepository, MessageRepository, Pagination,
    },
};

pub type PgPool = Pool<Postgres>;

#[derive(Clone)]
pub struct PostgresClientRepository {
    pool: PgPool,
}

impl PostgresClientRepository {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }
}

#[async_trait]
impl ClientRepository for PostgresClientRepository {
    async fn create(&self, client: &Client) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO clients (id, email, display_name, comment, owner_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(client.id)
        .bind(&client.email)
        .bind(&client.display_name)
        .bind(&client.comment)
        .bind(client.owner_id)
        .bind(client.created_at)
        .bind(client.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| unique_violation(err, &client.email))?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Client>> {
        let record = sqlx::query_as::<_, ClientRecord>(
            r#"SELECT id, email, display_name, comment, owner_id, created_at, updated_at FROM clients WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record.map(Client::from))
    }

    async fn get_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Client>> {
        let records = sqlx::query_as::<_, ClientRecord>(
            r#"SELECT id, email, display_name, comment, owner_id, created_at, updated_at FROM clients WHERE id = ANY($1)"#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(records.into_iter().map(Client::from).collect())
    }

    async fn update(&self, client: &Client) -> anyhow::Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE clients
            SET email = $2,
                display_name = $3,
                comment = $4,
                updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(client.id)
        .bind(&client.email)
        .bind(&client.display_name)
        .bind(&client.comment)
        .bind(client.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| unique_violation(err, &client.email))?;
        ensure_affected(result.rows_affected(), "client", client.id)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        let result = sqlx::query(r#"DELETE FROM clients WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        ensure_affected(result.rows_affected(), "client", id)
    }

    async fn list(&self) -> anyhow::Result<Vec<Client>> {
        let records = sqlx::query_as::<_, ClientRecord>(
            r#"SELECT id, email, display_name, comment, owner_id, created_at, updated_at FROM clients ORDER BY email"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(records.into_iter().map(Client::from).collect())
    }

    async fn count(&self) -> anyhow::Result<u64> {
        let row = sqlx::query(r#"SELECT COUNT(*) AS total FROM clients"#)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>("total")? as u64)
    }
}

#[derive(Clone)]
pub struct PostgresMessageRepository {
    pool: PgPool,
}

impl PostgresMessageRepository {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }
}

#[async_trait]
impl MessageRepository for PostgresMessageRepository {
    async fn create(&self, message: &Message) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, subject, body, owner_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(message.id)
        .bind(&message.subject)
        .bind(&message.body)
        .bind(message.owner_id)
        .bind(message.created_at)
        .bind(message.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Message>> {
        let record = sqlx::query_as::<_, MessageRecord>(
            r#"SELECT id, subject, body, owner_id, created_at, updated_at FROM messages WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record.map(Message::from))
    }

    async fn update(&self, message: &Message) -> anyhow::Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET subject = $2,
                body = $3,
                updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(message.id)
        .bind(&message.subject)
        .bind(&message.body)
        .bind(message.updated_at)
        .execute(&self.pool)
        .await?;
        ensure_affected(result.rows_affected(), "message", message.id)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        let result = sqlx::query(r#"DELETE FROM messages WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        ensure_affected(result.rows_affected(), "message", id)
    }

    async fn list(&self) -> anyhow::Result<Vec<Message>> {
        let records = sqlx::query_as::<_, MessageRecord>(
            r#"SELECT id, subject, body, owner_id, created_at, updated_at FROM messages ORDER BY created_at DESC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(records.into_iter().map(Message::from).collect())
    }
}

#[derive(Clone)]
pub struct PostgresCampaignRepository {
    pool: PgPool,
}

impl PostgresCampaignRepository {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }

    async fn recipients_of(&self, ids: &[Uuid]) -> anyhow::Result<HashMap<Uuid, BTreeSet<Uuid>>> {
        let rows = sqlx::query(
            r#"SELECT campaign_id, client_id FROM campaign_recipients WHERE campaign_id = ANY($1)"#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut recipients: HashMap<Uuid, BTreeSet<Uuid>> = HashMap::new();
        for row in rows {
            recipients
                .entry(row.try_get("campaign_id")?)
                .or_default()
                .insert(row.try_get("client_id")?);
        }
        Ok(recipients)
    }
}

const CAMPAIGN_COLUMNS: &str = "id, message_id, status, first_shipment_at, end_shipment_at, disabled, owner_id, created_at, updated_at";

#[async_trait]
impl CampaignRepository for PostgresCampaignRepository {
    async fn create(&self, campaign: &Campaign) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO campaigns (
                id, message_id, status, first_shipment_at, end_shipment_at, disabled, owner_id,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(campaign.id)
        .bind(campaign.message_id)
        .bind(campaign.status.as_str())
        .bind(campaign.first_shipment_at)
        .bind(campaign.end_shipment_at)
        .bind(campaign.disabled)
        .bind(campaign.owner_id)
        .bind(campaign.created_at)
        .bind(campaign.updated_at)
        .execute(&mut *tx)
        .await?;

        replace_recipients(&mut tx, campaign.id, &campaign.recipient_ids).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Campaign>> {
        let record = sqlx::query_as::<_, CampaignRecord>(&format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(record) = record else {
            return Ok(None);
        };
        let mut recipients = self.recipients_of(&[id]).await?;
        record
            .into_campaign(recipients.remove(&id).unwrap_or_default())
            .map(Some)
    }

    async fn set_disabled(
        &self,
        id: Uuid,
        disabled: bool,
        at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let result = sqlx::query(
            r#"UPDATE campaigns SET disabled = $2, updated_at = $3 WHERE id = $1"#,
        )
        .bind(id)
        .bind(disabled)
        .bind(at)
        .execute(&self.pool)
        .await?;
        ensure_affected(result.rows_affected(), "campaign", id)
    }

    async fn set_recipients(
        &self,
        id: Uuid,
        recipient_ids: &BTreeSet<Uuid>,
        at: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let mut tx = self.pool.begin().await?;
        // Takes the row lock a concurrent launch waits on.
        let result = sqlx::query(
            r#"UPDATE campaigns SET updated_at = $2 WHERE id = $1 AND status = 'created'"#,
        )
        .bind(id)
        .bind(at)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        replace_recipients(&mut tx, id, recipient_ids).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn set_message(
        &self,
        id: Uuid,
        message_id: Uuid,
        at: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE campaigns
            SET message_id = $2,
                updated_at = $3
            WHERE id = $1 AND status = 'created'
            "#,
        )
        .bind(id)
        .bind(message_id)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn detach_recipient(&self, client_id: Uuid, at: DateTime<Utc>) -> anyhow::Result<u64> {
        let mut tx = self.pool.begin().await?;
        let rows = sqlx::query(
            r#"
            UPDATE campaigns
            SET updated_at = $2
            WHERE status = 'created'
              AND id IN (SELECT campaign_id FROM campaign_recipients WHERE client_id = $1)
            RETURNING id
            "#,
        )
        .bind(client_id)
        .bind(at)
        .fetch_all(&mut *tx)
        .await?;
        let ids: Vec<Uuid> = rows
            .iter()
            .map(|row| row.try_get("id"))
            .collect::<Result<_, _>>()?;

        sqlx::query(
            r#"DELETE FROM campaign_recipients WHERE client_id = $1 AND campaign_id = ANY($2)"#,
        )
        .bind(client_id)
        .bind(&ids)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(ids.len() as u64)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        let result = sqlx::query(r#"DELETE FROM campaigns WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        ensure_affected(result.rows_affected(), "campaign", id)
    }

    async fn list(&self) -> anyhow::Result<Vec<Campaign>> {
        let records = sqlx::query_as::<_, CampaignRecord>(&format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<Uuid> = records.iter().map(|record| record.id).collect();
        let mut recipients = self.recipients_of(&ids).await?;
        records
            .into_iter()
            .map(|record| {
                let set = recipients.remove(&record.id).unwrap_or_default();
                record.into_campaign(set)
            })
            .collect()
    }

    async fn count_by_status(&self, status: Option<CampaignStatus>) -> anyhow::Result<u64> {
        let row = sqlx::query(
            r#"SELECT COUNT(*) AS total FROM campaigns WHERE ($1::TEXT IS NULL OR status = $1)"#,
        )
        .bind(status.map(|s| s.as_str()))
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get::<i64, _>("total")? as u64)
    }

    async fn transition(
        &self,
        campaign: &Campaign,
        expected: CampaignStatus,
    ) -> anyhow::Result<bool> {
        let mut tx = self.pool.begin().await?;
        let stored = sqlx::query(
            r#"SELECT status, disabled, message_id FROM campaigns WHERE id = $1 FOR UPDATE"#,
        )
        .bind(campaign.id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(stored) = stored else {
            return Ok(false);
        };
        if stored.try_get::<String, _>("status")? != expected.as_str() {
            return Ok(false);
        }

        if campaign.status == CampaignStatus::Launched {
            // Read after the row lock so a committed recipient edit is visible.
            let rows = sqlx::query(
                r#"SELECT client_id FROM campaign_recipients WHERE campaign_id = $1"#,
            )
            .bind(campaign.id)
            .fetch_all(&mut *tx)
            .await?;
            let recipients = rows
                .iter()
                .map(|row| row.try_get("client_id"))
                .collect::<Result<BTreeSet<Uuid>, _>>()?;
            if stored.try_get::<bool, _>("disabled")?
                || stored.try_get::<Option<Uuid>, _>("message_id")? != campaign.message_id
                || recipients != campaign.recipient_ids
            {
                return Ok(false);
            }
        }

        sqlx::query(
            r#"
            UPDATE campaigns
            SET status = $2,
                first_shipment_at = COALESCE(first_shipment_at, $3),
                end_shipment_at = $4,
                updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(campaign.id)
        .bind(campaign.status.as_str())
        .bind(campaign.first_shipment_at)
        .bind(campaign.end_shipment_at)
        .bind(campaign.updated_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(true)
    }
}

async fn replace_recipients(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    campaign_id: Uuid,
    recipient_ids: &BTreeSet<Uuid>,
) -> anyhow::Result<()> {
    sqlx::query(r#"DELETE FROM campaign_recipients WHERE campaign_id = $1"#)
        .bind(campaign_id)
        .execute(&mut **tx)
        .await?;

    let ids: Vec<Uuid> = recipient_ids.iter().copied().collect();
    if ids.is_empty() {
        return Ok(());
    }
    sqlx::query(
        r#"
        INSERT INTO campaign_recipients (campaign_id, client_id)
        SELECT $1, client_id FROM UNNEST($2::UUID[]) AS client_id
        "#,
    )
    .bind(campaign_id)
    .bind(&ids)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[derive(Clone)]
pub struct PostgresAttemptRepository {
    pool: PgPool,
}

impl PostgresAttemptRepository {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }
}

const ATTEMPT_COLUMNS: &str = "id, campaign_id, run_id, recipient_id, recipient_email, attempted_at, outcome, transport_response, owner_id";

#[async_trait]
impl AttemptRepository for PostgresAttemptRepository {
    async fn insert(&self, attempt: &DeliveryAttempt) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO delivery_attempts (
                id, campaign_id, run_id, recipient_id, recipient_email, attempted_at, outcome,
                transport_response, owner_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(attempt.id)
        .bind(attempt.campaign_id)
        .bind(attempt.run_id)
        .bind(attempt.recipient_id)
        .bind(&attempt.recipient_email)
        .bind(attempt.attempted_at)
        .bind(attempt.outcome.as_str())
        .bind(&attempt.transport_response)
        .bind(attempt.owner_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<DeliveryAttempt>> {
        let record = sqlx::query_as::<_, AttemptRecord>(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM delivery_attempts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        record.map(DeliveryAttempt::try_from).transpose()
    }

    async fn list(
        &self,
        campaign_id: Option<Uuid>,
        pagination: Pagination,
    ) -> anyhow::Result<(Vec<DeliveryAttempt>, bool)> {
        let limit = pagination.limit() as i64;
        let offset = pagination.offset() as i64;

        // Fetch one extra row to learn whether another page exists.
        let records = sqlx::query_as::<_, AttemptRecord>(&format!(
            r#"
            SELECT {ATTEMPT_COLUMNS}
            FROM delivery_attempts
            WHERE ($1::UUID IS NULL OR campaign_id = $1)
            ORDER BY attempted_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(campaign_id)
        .bind(limit + 1)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let has_more = records.len() > limit as usize;
        let attempts = records
            .into_iter()
            .take(limit as usize)
            .map(DeliveryAttempt::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((attempts, has_more))
    }
}

fn unique_violation(err: sqlx::Error, email: &str) -> anyhow::Error {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            DomainError::AlreadyExists(format!("client {email}")).into()
        }
        _ => err.into(),
    }
}

fn ensure_affected(rows: u64, entity: &str, id: Uuid) -> anyhow::Result<()> {
    if rows == 0 {
        return Err(DomainError::NotFound(format!("{entity} {id}")).into());
    }
    Ok(())
}

#[derive(FromRow)]
struct ClientRecord {
    id: Uuid,
    email: String,
    display_name: Option<String>,
    comment: Option<String>,
    owner_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ClientRecord> for Client {
    fn from(value: ClientRecord) -> Self {
        Self {
            id: value.id,
            email: value.email,
            display_name: value.display_name,
            comment: value.comment,
            owner_id: value.owner_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(FromRow)]
struct MessageRecord {
    id: Uuid,
    subject: String,
    body: String,
    owner_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MessageRecord> for Message {
    fn from(value: MessageRecord) -> Self {
        Self {
            id: value.id,
            subject: value.subject,
            body: value.body,
            owner_id: value.owner_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(FromRow)]
struct CampaignRecord {
    id: Uuid,
    message_id: Option<Uuid>,
    status: String,
    first_shipment_at: Option<DateTime<Utc>>,
    end_shipment_at: Option<DateTime<Utc>>,
    disabled: bool,
    owner_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CampaignRecord {
    fn into_campaign(self, recipient_ids: BTreeSet<Uuid>) -> anyhow::Result<Campaign> {
        let status = CampaignStatus::from_str(&self.status)
            .ok_or_else(|| anyhow::anyhow!("unknown campaign status {}", self.status))?;
        Ok(Campaign {
            id: self.id,
            message_id: self.message_id,
            recipient_ids,
            status,
            first_shipment_at: self.first_shipment_at,
            end_shipment_at: self.end_shipment_at,
            disabled: self.disabled,
            owner_id: self.owner_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct AttemptRecord {
    id: Uuid,
    campaign_id: Uuid,
    run_id: Uuid,
    recipient_id: Uuid,
    recipient_email: String,
    attempted_at: DateTime<Utc>,
    outcome: String,
    transport_response: String,
    owner_id: Option<Uuid>,
}

impl TryFrom<AttemptRecord> for DeliveryAttempt {
    type Error = anyhow::Error;

    fn try_from(value: AttemptRecord) -> Result<Self, Self::Error> {
        let outcome = AttemptOutcome::from_str(&value.outcome)
            .ok_or_else(|| anyhow::anyhow!("unknown attempt outcome {}", value.outcome))?;
        Ok(Self {
            id: value.id,
            campaign_id: value.campaign_id,
            run_id: value.run_id,
            recipient_id: value.recipient_id,
            recipient_email: value.recipient_email,
            attempted_at: value.attempted_at,
            outcome,
            transport_response: value.transport_response,
            owner_id: value.owner_id,
        })
    }
}
