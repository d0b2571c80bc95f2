use std::str::FromStr;

use anyhow::{Context, Result};

use crate::api::ApiUrls;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
    pub webhook_secret: String,
    /// RazorpayX business account payouts are drawn from.
    pub account_number: String,
    pub base_url: String,
}

impl std::fmt::Debug for RazorpayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayConfig")
            .field("key_id", &self.key_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

#[derive(Debug, Clone)]
pub struct PayoutLimits {
    pub min_withdrawal: i64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub razorpay: RazorpayConfig,
    pub services: ApiUrls,
    pub workers: WorkerConfig,
    pub payouts: PayoutLimits,
}

/// Reads the service configuration from the environment. Call after `bootstrap::init_env`.
pub fn load() -> Result<Config> {
    Ok(Config {
        server: ServerConfig {
            port: parse_or("PORT", 3000)?,
        },
        database: DatabaseConfig {
            url: required("DATABASE_URL")?,
            max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10)?,
        },
        razorpay: RazorpayConfig {
            key_id: required("RAZORPAY_KEY_ID")?,
            key_secret: required("RAZORPAY_KEY_SECRET")?,
            webhook_secret: required("RAZORPAY_WEBHOOK_SECRET")?,
            account_number: std::env::var("RAZORPAY_ACCOUNT_NUMBER").unwrap_or_default(),
            base_url: std::env::var("RAZORPAY_BASE_URL")
                .unwrap_or("https://api.razorpay.com/v1".to_string()),
        },
        services: ApiUrls::init(),
        workers: WorkerConfig {
            workers: parse_or("SETTLEMENT_WORKERS", 4)?,
            queue_capacity: parse_or("SETTLEMENT_QUEUE_CAPACITY", 256)?,
        },
        payouts: PayoutLimits {
            min_withdrawal: parse_or("MIN_WITHDRAWAL_PAISE", 10_000)?,
        },
    })
}

fn required(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("Missing environment variable {name}"))
}

fn parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("Invalid value for {name}: {raw}")),
        Err(_) => Ok(default),
    }
}
