use std::time::Duration;

use chadempire_core::GameError;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://chadempire.db?mode=rwc";

/// Process settings, read once from the environment in `main`.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind: String,
    pub api_key: String,
    pub session_secret: String,
    pub db_timeout: Duration,
    pub spin_retries: u32,
    pub db_max_connections: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.into(),
            bind: "127.0.0.1:8080".into(),
            api_key: "dev-key".into(),
            session_secret: "dev-session-secret".into(),
            db_timeout: Duration::from_millis(5_000),
            spin_retries: 2,
            db_max_connections: 5,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, GameError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` but reading through `lookup`, so tests need not
    /// touch the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, GameError> {
        let defaults = Self::default();
        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            bind: lookup("BIND").unwrap_or(defaults.bind),
            api_key: lookup("API_KEY").unwrap_or(defaults.api_key),
            session_secret: lookup("SESSION_SECRET").unwrap_or(defaults.session_secret),
            db_timeout: match lookup("DB_TIMEOUT_MS") {
                Some(raw) => Duration::from_millis(parse_number("DB_TIMEOUT_MS", &raw)?),
                None => defaults.db_timeout,
            },
            spin_retries: match lookup("SPIN_RETRIES") {
                Some(raw) => parse_number("SPIN_RETRIES", &raw)?,
                None => defaults.spin_retries,
            },
            db_max_connections: match lookup("DB_MAX_CONNECTIONS") {
                Some(raw) => parse_number::<u32>("DB_MAX_CONNECTIONS", &raw)?.max(1),
                None => defaults.db_max_connections,
            },
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, GameError> {
    raw.trim()
        .parse()
        .map_err(|_| GameError::InvalidConfiguration(format!("{key} must be a non-negative integer, got {raw:?}")))
}
