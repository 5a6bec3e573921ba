//! Process configuration
//!
//! Built once in `main` from the environment and shared immutably.

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_CURRENCY: &str = "$";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_NOTICE_TTL_SECS: u64 = 5;

/// Immutable service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Bot API token; webhooks are rejected while unset
    pub telegram_token: Option<String>,
    pub telegram_api_base: String,
    /// Expected value of the `X-Telegram-Bot-Api-Secret-Token` header
    pub webhook_secret: Option<String>,
    pub database_path: PathBuf,
    pub port: u16,
    /// Prefix used when rendering amounts (`$20.00`)
    pub currency_symbol: String,
    pub telegram_timeout: Duration,
    /// How long one-shot notices stay in the chat before being deleted
    pub notice_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            telegram_token: None,
            telegram_api_base: DEFAULT_API_BASE.to_string(),
            webhook_secret: None,
            database_path: default_database_path(),
            port: DEFAULT_PORT,
            currency_symbol: DEFAULT_CURRENCY.to_string(),
            telegram_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            notice_ttl: Duration::from_secs(DEFAULT_NOTICE_TTL_SECS),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        Self {
            telegram_token: get("TELEGRAM_TOKEN"),
            telegram_api_base: get("TELEGRAM_API_BASE")
                .map_or(defaults.telegram_api_base, |b| b.trim_end_matches('/').to_string()),
            webhook_secret: get("TELEGRAM_WEBHOOK_SECRET"),
            database_path: get("GUILD_DB_PATH").map_or(defaults.database_path, PathBuf::from),
            port: get("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            currency_symbol: get("CURRENCY_SYMBOL").unwrap_or(defaults.currency_symbol),
            telegram_timeout: get("TELEGRAM_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .map_or(defaults.telegram_timeout, Duration::from_secs),
            notice_ttl: get("NOTICE_TTL_SECS")
                .and_then(|s| s.parse().ok())
                .map_or(defaults.notice_ttl, Duration::from_secs),
        }
    }

    pub fn bot_token_configured(&self) -> bool {
        self.telegram_token.is_some()
    }
}

fn default_database_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(format!("{home}/.guild-ledger/ledger.db"))
}
