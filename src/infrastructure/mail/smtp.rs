use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::{self, PoolConfig, authentication::Credentials},
};

use crate::{
    application::services::transport::{MailConnection, MailTransport, TransportError},
    domain::value_objects::OutboundEmail,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpTls {
    StartTls,
    Tls,
    None,
}

impl SmtpTls {
    pub fn from_str(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "starttls" => Some(SmtpTls::StartTls),
            "tls" => Some(SmtpTls::Tls),
            "none" => Some(SmtpTls::None),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub tls: SmtpTls,
    /// Socket timeout for each SMTP command.
    pub timeout: Duration,
}

pub struct SmtpTransport {
    config: SmtpConfig,
    from: Mailbox,
    pool_size: u32,
}

impl SmtpTransport {
    pub fn new(config: SmtpConfig, pool_size: u32) -> anyhow::Result<Arc<dyn MailTransport>> {
        let from = config
            .from
            .parse::<Mailbox>()
            .with_context(|| format!("invalid SMTP_FROM address {}", config.from))?;
        Ok(Arc::new(Self {
            config,
            from,
            pool_size: pool_size.max(1),
        }) as Arc<dyn MailTransport>)
    }

    fn build(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, TransportError> {
        let host = self.config.host.as_str();
        let builder = match self.config.tls {
            SmtpTls::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|err| TransportError::Connection(err.to_string()))?,
            SmtpTls::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .map_err(|err| TransportError::Connection(err.to_string()))?,
            SmtpTls::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
        };

        let mut builder = builder
            .port(self.config.port)
            .timeout(Some(self.config.timeout))
            .pool_config(PoolConfig::new().max_size(self.pool_size));
        if let (Some(username), Some(password)) = (&self.config.username, &self.config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }
        Ok(builder.build())
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn connect(&self) -> Result<Box<dyn MailConnection>, TransportError> {
        let transport = self.build()?;
        match transport.test_connection().await {
            Ok(true) => {}
            Ok(false) => {
                return Err(TransportError::Connection(format!(
                    "{}:{} did not accept the connection",
                    self.config.host, self.config.port
                )));
            }
            Err(err) => return Err(classify(err)),
        }
        tracing::debug!(host = %self.config.host, port = self.config.port, "smtp relay reachable");

        Ok(Box::new(SmtpConnection {
            transport,
            from: self.from.clone(),
        }))
    }
}

/// Pooled lettre transport; dropping it closes the pooled SMTP sessions.
struct SmtpConnection {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

#[async_trait]
impl MailConnection for SmtpConnection {
    async fn send(&self, email: &OutboundEmail) -> Result<String, TransportError> {
        let to = email
            .to
            .parse::<Mailbox>()
            .map_err(|err| TransportError::InvalidAddress {
                address: email.to.clone(),
                reason: err.to_string(),
            })?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .map_err(|err| TransportError::Protocol(err.to_string()))?;

        let response = self.transport.send(message).await.map_err(classify)?;
        let text = response.message().collect::<Vec<_>>().join(" ");
        Ok(format!("{} {}", response.code(), text).trim().to_string())
    }
}

fn classify(err: smtp::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_permanent() || err.is_transient() {
        TransportError::Rejected(err.to_string())
    } else if err.is_client() || err.is_response() {
        TransportError::Protocol(err.to_string())
    } else {
        TransportError::Connection(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(from: &str) -> SmtpConfig {
        SmtpConfig {
            host: "localhost".into(),
            port: 2525,
            username: None,
            password: None,
            from: from.into(),
            tls: SmtpTls::None,
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn tls_mode_parses_case_insensitively() {
        assert_eq!(SmtpTls::from_str("STARTTLS"), Some(SmtpTls::StartTls));
        assert_eq!(SmtpTls::from_str("tls"), Some(SmtpTls::Tls));
        assert_eq!(SmtpTls::from_str("none"), Some(SmtpTls::None));
        assert_eq!(SmtpTls::from_str("ssl"), None);
    }

    #[test]
    fn rejects_invalid_from_address() {
        assert!(SmtpTransport::new(config("not an address"), 1).is_err());
        assert!(SmtpTransport::new(config("Mailer <mailer@example.com>"), 1).is_ok());
    }

    #[tokio::test]
    async fn unreachable_relay_is_reported_on_connect() {
        // Port 9 (discard) is closed on test machines.
        let mut config = config("mailer@example.com");
        config.port = 9;
        let transport = SmtpTransport::new(config, 1).unwrap();

        assert!(transport.connect().await.is_err());
    }
}
