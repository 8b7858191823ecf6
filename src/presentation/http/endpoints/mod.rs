pub mod attempts;
pub mod campaigns;
pub mod clients;
pub mod health;
pub mod messages;
pub mod root;
