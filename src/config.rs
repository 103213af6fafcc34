use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub key_id: String,
    pub key_secret: String,
    pub webhook_secret: String,
    pub timeout: Duration,
    /// Header carrying the webhook signature.
    pub signature_header: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub currency: String,
    pub frontend_base_url: String,
    pub gateway: GatewayConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let or_default =
            |name: &'static str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let port = parse(&lookup, "PORT", 8080u16)?;
        let timeout_secs = parse(&lookup, "GATEWAY_TIMEOUT_SECS", 10u64)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "GATEWAY_TIMEOUT_SECS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            host: or_default("HOST", "0.0.0.0"),
            port,
            currency: or_default("CURRENCY", "INR"),
            frontend_base_url: or_default("FRONTEND_BASE_URL", "http://localhost:3000"),
            gateway: GatewayConfig {
                base_url: or_default("GATEWAY_BASE_URL", "https://api.razorpay.com"),
                key_id: required("GATEWAY_KEY_ID")?,
                key_secret: required("GATEWAY_KEY_SECRET")?,
                webhook_secret: required("GATEWAY_WEBHOOK_SECRET")?,
                timeout: Duration::from_secs(timeout_secs),
                signature_header: or_default("GATEWAY_SIGNATURE_HEADER", "x-razorpay-signature")
                    .to_ascii_lowercase(),
            },
        })
    }
}

fn parse<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
