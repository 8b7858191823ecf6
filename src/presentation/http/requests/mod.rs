use poem_openapi::{Object, types::Email};
use uuid::Uuid;

#[derive(Object, Debug)]
pub struct ClientRequestDto {
    pub email: Email,
    #[oai(validator(max_length = 150))]
    pub display_name: Option<String>,
    #[oai(validator(max_length = 1000))]
    pub comment: Option<String>,
    pub owner_id: Option<Uuid>,
}

#[derive(Object, Debug)]
pub struct MessageRequestDto {
    #[oai(validator(min_length = 1, max_length = 100))]
    pub subject: String,
    pub body: String,
    pub owner_id: Option<Uuid>,
}

#[derive(Object, Debug)]
pub struct CreateCampaignRequestDto {
    pub message_id: Option<Uuid>,
    #[oai(default)]
    pub recipient_ids: Vec<Uuid>,
    #[oai(default)]
    pub disabled: bool,
    pub owner_id: Option<Uuid>,
}

#[derive(Object, Debug)]
pub struct SetRecipientsRequestDto {
    pub recipient_ids: Vec<Uuid>,
}

#[derive(Object, Debug)]
pub struct SetMessageRequestDto {
    pub message_id: Uuid,
}

#[derive(Object, Debug)]
pub struct SetDisabledRequestDto {
    pub disabled: bool,
}
