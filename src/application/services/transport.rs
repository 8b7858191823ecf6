use async_trait::async_trait;
use thiserror::Error;

use crate::domain::value_objects::OutboundEmail;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("timeout")]
    Timeout,
    #[error("invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("rejected by server: {0}")]
    Rejected(String),
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Outbound mail channel. A dispatch run calls [`connect`](Self::connect) once and
/// sends every recipient through the returned connection.
#[async_trait]
pub trait MailTransport: Send + Sync {
    fn name(&self) -> &'static str;
    async fn connect(&self) -> Result<Box<dyn MailConnection>, TransportError>;
}

#[async_trait]
pub trait MailConnection: Send + Sync {
    /// Sends one message and returns the server reply, which may be empty.
    async fn send(&self, email: &OutboundEmail) -> Result<String, TransportError>;
}
