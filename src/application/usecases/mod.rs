pub mod complete_campaign;
pub mod launch_campaign;
pub mod list_attempts;
pub mod manage_campaigns;
pub mod manage_clients;
pub mod manage_messages;
pub mod summary;
