use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

const DEFAULT_TOKEN_TTL_HOURS: i64 = 24 * 30;
const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365 * 10;

pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub token_ttl: chrono::Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup, so tests need not touch the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = lookup("MESSAGELY_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("MESSAGELY_JWT_SECRET is unset or still a placeholder");
        }

        let db_path = lookup("MESSAGELY_DB_PATH")
            .unwrap_or_else(|| "messagely.db".into())
            .into();
        let host = lookup("MESSAGELY_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = lookup("MESSAGELY_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("MESSAGELY_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .context("MESSAGELY_HOST must be an IP address")?;

        let ttl_hours: i64 = match lookup("MESSAGELY_TOKEN_TTL_HOURS") {
            Some(v) => v.parse().context("MESSAGELY_TOKEN_TTL_HOURS must be an integer")?,
            None => DEFAULT_TOKEN_TTL_HOURS,
        };
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&ttl_hours) {
            bail!("MESSAGELY_TOKEN_TTL_HOURS must be between 1 and {MAX_TOKEN_TTL_HOURS}");
        }
        let token_ttl = chrono::Duration::try_hours(ttl_hours)
            .context("MESSAGELY_TOKEN_TTL_HOURS is out of range")?;

        Ok(Self {
            jwt_secret,
            db_path,
            addr,
            token_ttl,
        })
    }
}
