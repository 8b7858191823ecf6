pub mod attempt;
pub mod campaign;
pub mod client;
pub mod message;

pub use attempt::{AttemptOutcome, DeliveryAttempt};
pub use campaign::{Campaign, CampaignStatus};
pub use client::Client;
pub use message::Message;
