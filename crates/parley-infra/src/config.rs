//! Configuration loader for Parley.
//!
//! Reads an optional TOML file into [`BotConfig`], then overlays the
//! environment variables the bot has always been deployed with. A missing
//! or malformed file falls back to defaults; credentials are expected to
//! come from the environment anyway.

use std::path::Path;
use std::str::FromStr;

use secrecy::SecretString;

use parley_types::config::{BotConfig, StoreBackend};
use parley_types::error::ConfigError;

pub const ENV_BOT_TOKEN: &str = "TELEGRAM_BOT_API_KEY";
pub const ENV_LLM_KEY: &str = "GROQ_API_KEY";
pub const ENV_TEXT_MODEL: &str = "AI_MODEL";
pub const ENV_ADMIN_CHAT: &str = "ADMINID";
pub const ENV_LOG_BOT_TOKEN: &str = "LOGAPIKEY";
pub const ENV_REDIS_URL: &str = "REDIS_URL";
pub const ENV_PORT: &str = "PORT";
pub const ENV_WEBHOOK_SECRET: &str = "PARLEY_WEBHOOK_SECRET";
pub const ENV_LLM_BASE_URL: &str = "GROQ_BASE_URL";
pub const ENV_STORE_BACKEND: &str = "PARLEY_STORE_BACKEND";

/// Load configuration from `path` (if any) and the process environment.
pub async fn load_config(path: Option<&Path>) -> Result<BotConfig, ConfigError> {
    load_config_with(path, |key| std::env::var(key).ok()).await
}

/// Like [`load_config`], reading variables through `lookup`.
///
/// Empty values count as unset.
pub async fn load_config_with<F>(path: Option<&Path>, lookup: F) -> Result<BotConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => read_config_file(path).await,
        None => BotConfig::default(),
    };
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    apply_env(&mut config, non_empty)?;
    Ok(config)
}

async fn read_config_file(path: &Path) -> BotConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return BotConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return BotConfig::default();
        }
    };

    match toml::from_str::<BotConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            BotConfig::default()
        }
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}

fn apply_env<F>(config: &mut BotConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup(ENV_BOT_TOKEN) {
        config.telegram.bot_token = Some(SecretString::from(v));
    }
    if let Some(v) = lookup(ENV_LOG_BOT_TOKEN) {
        config.telegram.log_bot_token = Some(SecretString::from(v));
    }
    if let Some(v) = lookup(ENV_ADMIN_CHAT) {
        config.telegram.admin_chat_id = Some(parse_var(ENV_ADMIN_CHAT, &v)?);
    }
    if let Some(v) = lookup(ENV_WEBHOOK_SECRET) {
        config.telegram.webhook_secret = Some(SecretString::from(v));
    }
    if let Some(v) = lookup(ENV_LLM_KEY) {
        config.llm.api_key = Some(SecretString::from(v));
    }
    if let Some(v) = lookup(ENV_TEXT_MODEL) {
        config.llm.text_model = v;
    }
    if let Some(v) = lookup(ENV_LLM_BASE_URL) {
        config.llm.base_url = v;
    }
    if let Some(v) = lookup(ENV_REDIS_URL) {
        config.store.redis_url = v;
    }
    if let Some(v) = lookup(ENV_STORE_BACKEND) {
        config.store.backend = match v.trim().to_ascii_lowercase().as_str() {
            "redis" => StoreBackend::Redis,
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::InvalidValue {
                    key: ENV_STORE_BACKEND.to_string(),
                    message: format!("expected 'redis' or 'memory', got '{other}'"),
                });
            }
        };
    }
    if let Some(v) = lookup(ENV_PORT) {
        config.server.port = parse_var(ENV_PORT, &v)?;
    }
    Ok(())
}

/// Require the bot token only (webhook management commands).
pub fn require_bot_token(config: &BotConfig) -> Result<&SecretString, ConfigError> {
    config
        .telegram
        .bot_token
        .as_ref()
        .ok_or_else(|| ConfigError::MissingKeys(vec![ENV_BOT_TOKEN.to_string()]))
}

/// Require every credential the message path needs, reporting all that are missing.
pub fn validate(config: &BotConfig) -> Result<(), ConfigError> {
    let mut missing = Vec::new();
    if config.telegram.bot_token.is_none() {
        missing.push(ENV_BOT_TOKEN.to_string());
    }
    if config.llm.api_key.is_none() {
        missing.push(ENV_LLM_KEY.to_string());
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::MissingKeys(missing))
    }
}
