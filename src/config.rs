use std::{collections::HashMap, env, path::PathBuf, time::Duration};

use anyhow::Context;

/// Settings every service needs to serve HTTP and reach its database.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub app_name: String,
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Secrets for inbound signed calls, keyed by the caller's `x-service-name`.
    pub trusted_services: HashMap<String, String>,
    pub signature_max_age: Duration,
}

impl ServerConfig {
    pub fn from_env(default_name: &str, default_port: u16) -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(default_port);
        let app_name = env::var("APP_NAME").unwrap_or_else(|_| default_name.to_string());
        let trusted_services = parse_trusted_services(
            &env::var("TRUSTED_SERVICES").unwrap_or_default(),
        )?;
        let signature_max_age = Duration::from_secs(parse_or("SIGNATURE_MAX_AGE_SECS", 300)?);
        Ok(Self {
            app_name,
            database_url,
            host,
            port,
            trusted_services,
            signature_max_age,
        })
    }
}

/// A peer service reached through the signed client.
#[derive(Debug, Clone)]
pub struct PeerConfig {
    pub base_url: String,
    pub signature_key: String,
}

impl PeerConfig {
    fn from_env(url_var: &str, key_var: &str) -> anyhow::Result<Self> {
        Ok(Self {
            base_url: env::var(url_var).with_context(|| format!("{url_var} is not set"))?,
            signature_key: env::var(key_var).with_context(|| format!("{key_var} is not set"))?,
        })
    }

    /// `None` when `url_var` is unset.
    fn from_env_opt(url_var: &str, key_var: &str) -> anyhow::Result<Option<Self>> {
        if env::var(url_var).is_err() {
            return Ok(None);
        }
        Self::from_env(url_var, key_var).map(Some)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerKind {
    Channel,
    Kafka,
}

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub kind: BrokerKind,
    pub brokers: String,
    pub topic: String,
    pub group_id: String,
    pub max_retry: usize,
    pub backoff: Duration,
}

impl BrokerConfig {
    pub fn from_env(default_group: &str) -> anyhow::Result<Self> {
        let kind = match env::var("BROKER").unwrap_or_else(|_| "channel".into()).as_str() {
            "kafka" => BrokerKind::Kafka,
            "channel" => BrokerKind::Channel,
            other => anyhow::bail!("unknown BROKER {other}, expected channel or kafka"),
        };
        Ok(Self {
            kind,
            brokers: env::var("KAFKA_BROKERS").unwrap_or_else(|_| "localhost:9092".into()),
            topic: env::var("KAFKA_TOPIC").unwrap_or_else(|_| "payment-service-callback".into()),
            group_id: env::var("KAFKA_GROUP_ID").unwrap_or_else(|_| default_group.to_string()),
            max_retry: parse_or("KAFKA_MAX_RETRY", 3)?,
            backoff: Duration::from_millis(parse_or("KAFKA_BACKOFF_MS", 500)?),
        })
    }

    /// Topic that receives messages the consumer gave up on.
    pub fn parked_topic(&self) -> String {
        format!("{}.parked", self.topic)
    }
}

#[derive(Debug, Clone)]
pub struct OrderConfig {
    pub server: ServerConfig,
    pub jwt_secret: String,
    pub field: PeerConfig,
    /// Unset when the payment service runs in the same process.
    pub payment: Option<PeerConfig>,
    pub http_timeout: Duration,
    pub broker: BrokerConfig,
}

impl OrderConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            server: ServerConfig::from_env("order-service", 8003)?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            field: PeerConfig::from_env("FIELD_SERVICE_URL", "FIELD_SIGNATURE_KEY")?,
            payment: PeerConfig::from_env_opt("PAYMENT_SERVICE_URL", "PAYMENT_SIGNATURE_KEY")?,
            http_timeout: Duration::from_secs(parse_or("HTTP_TIMEOUT_SECS", 10)?),
            broker: BrokerConfig::from_env("order-service")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct MidtransConfig {
    pub server_key: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct InvoiceConfig {
    pub dir: PathBuf,
    pub public_url: String,
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub server: ServerConfig,
    pub midtrans: MidtransConfig,
    pub invoice: InvoiceConfig,
    pub http_timeout: Duration,
    pub broker: BrokerConfig,
}

impl PaymentConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            server: ServerConfig::from_env("payment-service", 8004)?,
            midtrans: MidtransConfig {
                server_key: env::var("MIDTRANS_SERVER_KEY")
                    .context("MIDTRANS_SERVER_KEY is not set")?,
                base_url: env::var("MIDTRANS_BASE_URL")
                    .unwrap_or_else(|_| "https://app.sandbox.midtrans.com".into()),
            },
            invoice: InvoiceConfig {
                dir: env::var("INVOICE_DIR")
                    .unwrap_or_else(|_| "invoices".into())
                    .into(),
                public_url: env::var("INVOICE_PUBLIC_URL")
                    .unwrap_or_else(|_| "http://127.0.0.1:8004/invoices".into()),
            },
            http_timeout: Duration::from_secs(parse_or("HTTP_TIMEOUT_SECS", 10)?),
            broker: BrokerConfig::from_env("payment-service")?,
        })
    }
}

fn parse_or<T>(var: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(var) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{var} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

/// Parses `name:secret,name:secret`.
pub fn parse_trusted_services(raw: &str) -> anyhow::Result<HashMap<String, String>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, secret) = entry
                .split_once(':')
                .with_context(|| format!("TRUSTED_SERVICES entry without secret: {entry}"))?;
            Ok((name.trim().to_string(), secret.trim().to_string()))
        })
        .collect()
}
