use poem_openapi::{ApiResponse, Object, payload::Json, payload::PlainText};
use uuid::Uuid;

use crate::presentation::models::{AttemptOutcomeKind, CampaignStatusKind, LaunchOutcomeKind};

#[derive(Object)]
pub struct ClientDto {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub comment: Option<String>,
    pub owner_id: Option<Uuid>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Object)]
pub struct MessageDto {
    pub id: Uuid,
    pub subject: String,
    pub body: String,
    pub owner_id: Option<Uuid>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Object)]
pub struct CampaignDto {
    pub id: Uuid,
    pub message_id: Option<Uuid>,
    pub recipient_ids: Vec<Uuid>,
    pub status: CampaignStatusKind,
    pub status_label: String,
    pub first_shipment_at: Option<String>,
    pub end_shipment_at: Option<String>,
    pub disabled: bool,
    pub owner_id: Option<Uuid>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Object)]
pub struct DeliveryAttemptDto {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub run_id: Uuid,
    pub recipient_id: Uuid,
    pub recipient_email: String,
    pub attempted_at: String,
    pub outcome: AttemptOutcomeKind,
    pub outcome_label: String,
    pub transport_response: String,
    pub owner_id: Option<Uuid>,
}

#[derive(Object)]
pub struct PaginatedAttemptsDto {
    pub attempts: Vec<DeliveryAttemptDto>,
    pub has_more: bool,
    pub next_offset: Option<u32>,
}

#[derive(Object)]
pub struct LaunchResultDto {
    pub campaign_id: Uuid,
    pub outcome: LaunchOutcomeKind,
    pub message: String,
    pub run_id: Option<Uuid>,
    pub recipients: Option<u32>,
}

#[derive(ApiResponse)]
pub enum LaunchCampaignResponse {
    /// The dispatch run was accepted and is sending in the background.
    #[oai(status = 202)]
    Launched(Json<LaunchResultDto>),
    /// The campaign lifecycle refused the launch.
    #[oai(status = 409)]
    Rejected(Json<LaunchResultDto>),
    #[oai(status = 404)]
    NotFound(PlainText<String>),
    #[oai(status = 503)]
    TransportUnavailable(PlainText<String>),
}

#[derive(Object)]
pub struct SummaryDto {
    pub campaigns_total: u64,
    pub campaigns_launched: u64,
    pub clients_total: u64,
}
