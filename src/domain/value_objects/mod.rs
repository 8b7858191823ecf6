use serde::{Deserialize, Serialize};

use crate::domain::models::Message;

/// Subject and body captured from a [`Message`] when a run starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageSnapshot {
    pub subject: String,
    pub body: String,
}

impl From<&Message> for MessageSnapshot {
    fn from(message: &Message) -> Self {
        Self {
            subject: message.subject.clone(),
            body: message.body.clone(),
        }
    }
}

/// A single addressed e-mail handed to the transport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutboundEmail {
    pub fn new(to: &str, snapshot: &MessageSnapshot) -> Self {
        Self {
            to: to.to_string(),
            subject: snapshot.subject.clone(),
            body: snapshot.body.clone(),
        }
    }
}
