use std::env::var;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;
use thiserror::Error;

use crate::{
    application::handlers::dispatch_engine::DispatchConfig,
    infrastructure::mail::smtp::{SmtpConfig, SmtpTls},
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required env param {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for env param {name}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub scheme: String,
    pub host: String,
    pub database: Option<DatabaseConfig>,
    pub smtp: Option<SmtpConfig>,
    pub dispatch: DispatchConfig,
    pub log_format: LogFormat,
}

impl Config {
    /// Reads the process environment, after loading `.env` if there is one.
    pub fn try_parse() -> Result<Config, ConfigError> {
        let _ = dotenv();
        Self::from_lookup(|name| var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let database = match env.optional("DATABASE_URL") {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: env.parsed_or("DATABASE_MAX_CONNECTIONS", 5)?,
            }),
            None => None,
        };

        let send_timeout = Duration::from_secs(env.parsed_or("SEND_TIMEOUT_SECS", 30)?);

        let smtp = match env.optional("SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                port: env.parsed_or("SMTP_PORT", 587)?,
                username: env.optional("SMTP_USER"),
                password: env.optional("SMTP_PASSWORD"),
                from: env.required("SMTP_FROM")?,
                tls: match env.optional("SMTP_TLS") {
                    Some(value) => SmtpTls::from_str(&value).ok_or(ConfigError::Invalid {
                        name: "SMTP_TLS",
                        value,
                    })?,
                    None => SmtpTls::StartTls,
                },
                timeout: send_timeout,
            }),
            None => None,
        };

        let concurrency: usize = env.parsed_or("DISPATCH_CONCURRENCY", 4)?;
        if concurrency == 0 {
            return Err(ConfigError::Invalid {
                name: "DISPATCH_CONCURRENCY",
                value: "0".to_string(),
            });
        }

        let log_format = match env.optional("LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "LOG_FORMAT",
                    value: other.to_string(),
                });
            }
        };

        Ok(Config {
            port: env.parsed("PORT")?,
            scheme: env.required("SCHEME")?,
            host: env.required("HOST")?,
            database,
            smtp,
            dispatch: DispatchConfig {
                concurrency,
                send_timeout,
            },
            log_format,
        })
    }

    pub fn server_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|value| !value.trim().is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.optional(name).ok_or(ConfigError::Missing(name))
    }

    fn parsed<T: FromStr>(&self, name: &'static str) -> Result<T, ConfigError> {
        let value = self.required(name)?;
        value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value })
    }

    fn parsed_or<T: FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError> {
        match self.optional(name) {
            Some(_) => self.parsed(name),
            None => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn parse(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| env.get(name).cloned())
    }

    const BASE: [(&str, &str); 3] = [("PORT", "8080"), ("SCHEME", "http"), ("HOST", "localhost")];

    #[test]
    fn minimal_environment_uses_defaults() {
        let config = parse(&BASE).unwrap();

        assert_eq!(config.server_url(), "http://localhost:8080");
        assert!(config.database.is_none());
        assert!(config.smtp.is_none());
        assert_eq!(config.dispatch.concurrency, 4);
        assert_eq!(config.dispatch.send_timeout, Duration::from_secs(30));
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn smtp_section_requires_from_address() {
        let mut pairs = BASE.to_vec();
        pairs.push(("SMTP_HOST", "smtp.example.com"));

        assert_eq!(parse(&pairs).unwrap_err(), ConfigError::Missing("SMTP_FROM"));

        pairs.push(("SMTP_FROM", "news@example.com"));
        pairs.push(("SMTP_TLS", "tls"));
        pairs.push(("SMTP_PORT", "465"));
        let smtp = parse(&pairs).unwrap().smtp.unwrap();
        assert_eq!(smtp.host, "smtp.example.com");
        assert_eq!(smtp.port, 465);
        assert_eq!(smtp.tls, SmtpTls::Tls);
        assert!(smtp.username.is_none());
    }

    #[test]
    fn invalid_values_name_the_offending_param() {
        let mut pairs = BASE.to_vec();
        pairs.push(("DISPATCH_CONCURRENCY", "many"));

        assert_eq!(
            parse(&pairs).unwrap_err(),
            ConfigError::Invalid {
                name: "DISPATCH_CONCURRENCY",
                value: "many".to_string()
            }
        );
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let mut pairs = BASE.to_vec();
        pairs.push(("DISPATCH_CONCURRENCY", "0"));

        assert!(matches!(
            parse(&pairs),
            Err(ConfigError::Invalid {
                name: "DISPATCH_CONCURRENCY",
                ..
            })
        ));
    }

    #[test]
    fn missing_port_is_reported() {
        assert_eq!(
            parse(&[("SCHEME", "http"), ("HOST", "localhost")]).unwrap_err(),
            ConfigError::Missing("PORT")
        );
    }
}
