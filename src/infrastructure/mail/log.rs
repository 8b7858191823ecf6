use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    application::services::transport::{MailConnection, MailTransport, TransportError},
    domain::value_objects::OutboundEmail,
};

/// Writes messages to the log instead of a relay. Used when no SMTP host is set.
pub struct LogTransport;

impl LogTransport {
    pub fn new() -> Arc<dyn MailTransport> {
        Arc::new(Self) as Arc<dyn MailTransport>
    }
}

#[async_trait]
impl MailTransport for LogTransport {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn connect(&self) -> Result<Box<dyn MailConnection>, TransportError> {
        Ok(Box::new(LogConnection))
    }
}

struct LogConnection;

#[async_trait]
impl MailConnection for LogConnection {
    async fn send(&self, email: &OutboundEmail) -> Result<String, TransportError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            body_len = email.body.len(),
            "[log transport] message accepted"
        );
        Ok(String::new())
    }
}
