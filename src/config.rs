use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Runtime settings read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    /// No token means offers are only logged.
    pub telegram_token: Option<String>,
    pub poll_interval: Duration,
    pub notify_delay: Duration,
    pub fetch_timeout: Duration,
    pub clock_offset_hours: Option<i64>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            database_path: get("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("apartments.db")),
            telegram_token: get("TELEGRAM_BOT_TOKEN"),
            poll_interval: Duration::from_secs(parse(&get, "POLL_INTERVAL_SECS")?.unwrap_or(60)),
            notify_delay: Duration::from_secs(parse(&get, "NOTIFY_DELAY_SECS")?.unwrap_or(5)),
            fetch_timeout: Duration::from_secs(parse(&get, "FETCH_TIMEOUT_SECS")?.unwrap_or(30)),
            clock_offset_hours: parse(&get, "CLOCK_OFFSET_HOURS")?,
        })
    }
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    get(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .with_context(|| format!("Invalid value for {key}: {value:?}"))
        })
        .transpose()
}
