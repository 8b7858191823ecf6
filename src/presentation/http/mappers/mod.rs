use crate::{
    domain::models::{Campaign, Client, DeliveryAttempt, Message},
    presentation::{
        http::responses::{CampaignDto, ClientDto, DeliveryAttemptDto, MessageDto},
        models::{AttemptOutcomeKind, CampaignStatusKind},
    },
};

pub fn map_client(client: &Client) -> ClientDto {
    ClientDto {
        id: client.id,
        email: client.email.clone(),
        display_name: client.display_name.clone(),
        comment: client.comment.clone(),
        owner_id: client.owner_id,
        created_at: client.created_at.to_rfc3339(),
        updated_at: client.updated_at.to_rfc3339(),
    }
}

pub fn map_message(message: &Message) -> MessageDto {
    MessageDto {
        id: message.id,
        subject: message.subject.clone(),
        body: message.body.clone(),
        owner_id: message.owner_id,
        created_at: message.created_at.to_rfc3339(),
        updated_at: message.updated_at.to_rfc3339(),
    }
}

pub fn map_campaign(campaign: &Campaign) -> CampaignDto {
    let status = CampaignStatusKind::from(campaign.status);
    CampaignDto {
        id: campaign.id,
        message_id: campaign.message_id,
        recipient_ids: campaign.recipient_ids.iter().copied().collect(),
        status,
        status_label: status.label().to_string(),
        first_shipment_at: campaign.first_shipment_at.map(|at| at.to_rfc3339()),
        end_shipment_at: campaign.end_shipment_at.map(|at| at.to_rfc3339()),
        disabled: campaign.disabled,
        owner_id: campaign.owner_id,
        created_at: campaign.created_at.to_rfc3339(),
        updated_at: campaign.updated_at.to_rfc3339(),
    }
}

pub fn map_attempt(attempt: &DeliveryAttempt) -> DeliveryAttemptDto {
    let outcome = AttemptOutcomeKind::from(attempt.outcome);
    DeliveryAttemptDto {
        id: attempt.id,
        campaign_id: attempt.campaign_id,
        run_id: attempt.run_id,
        recipient_id: attempt.recipient_id,
        recipient_email: attempt.recipient_email.clone(),
        attempted_at: attempt.attempted_at.to_rfc3339(),
        outcome,
        outcome_label: outcome.label().to_string(),
        transport_response: attempt.transport_response.clone(),
        owner_id: attempt.owner_id,
    }
}
