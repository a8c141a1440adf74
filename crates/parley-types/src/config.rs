//! Configuration types for Parley.
//!
//! `BotConfig` mirrors the optional `parley.toml` file. Every field has a
//! default so an empty file (or no file) is valid; credentials normally
//! arrive through environment variables and are overlaid by the loader in
//! `parley-infra`.

use secrecy::SecretString;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct BotConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Telegram Bot API settings.
#[derive(Debug, Deserialize)]
pub struct TelegramConfig {
    /// Token of the conversational bot.
    #[serde(default)]
    pub bot_token: Option<SecretString>,
    /// Chat that receives admin notifications.
    #[serde(default)]
    pub admin_chat_id: Option<i64>,
    /// Token of the separate bot used to post admin notifications.
    #[serde(default)]
    pub log_bot_token: Option<SecretString>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Expected `X-Telegram-Bot-Api-Secret-Token` header value.
    #[serde(default)]
    pub webhook_secret: Option<SecretString>,
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            admin_chat_id: None,
            log_bot_token: None,
            api_base: default_api_base(),
            webhook_secret: None,
        }
    }
}

/// Completion and transcription provider settings.
#[derive(Debug, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// OpenAI-compatible API root.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_text_model")]
    pub text_model: String,
    #[serde(default = "default_audio_model")]
    pub audio_model: String,
    /// Prepended to every completion request; never stored in history.
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_llm_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_text_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_audio_model() -> String {
    "whisper-large-v3".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_llm_base_url(),
            text_model: default_text_model(),
            audio_model: default_audio_model(),
            system_prompt: None,
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

/// Which key-value backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    /// Process-local store; state is lost on restart.
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            redis_url: default_redis_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Limits applied on the message hot path.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LimitsConfig {
    /// History keeps at most twice this many turns.
    #[serde(default = "default_max_history_pairs")]
    pub max_history_pairs: usize,
    #[serde(default = "default_inactivity_timeout_secs")]
    pub inactivity_timeout_secs: u64,
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,
    #[serde(default = "default_max_messages_per_window")]
    pub max_messages_per_window: u64,
    #[serde(default = "default_max_voice_file_bytes")]
    pub max_voice_file_bytes: u64,
    /// Maximum message length in UTF-16 code units.
    #[serde(default = "default_chunk_limit")]
    pub chunk_limit: usize,
}

fn default_max_history_pairs() -> usize {
    10
}

fn default_inactivity_timeout_secs() -> u64 {
    30 * 60
}

fn default_rate_limit_window_secs() -> u64 {
    60
}

fn default_max_messages_per_window() -> u64 {
    10
}

fn default_max_voice_file_bytes() -> u64 {
    20 * 1024 * 1024
}

fn default_chunk_limit() -> usize {
    4096
}

impl LimitsConfig {
    /// Upper bound on stored turns.
    pub fn max_turns(&self) -> usize {
        self.max_history_pairs * 2
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_history_pairs: default_max_history_pairs(),
            inactivity_timeout_secs: default_inactivity_timeout_secs(),
            rate_limit_window_secs: default_rate_limit_window_secs(),
            max_messages_per_window: default_max_messages_per_window(),
            max_voice_file_bytes: default_max_voice_file_bytes(),
            chunk_limit: default_chunk_limit(),
        }
    }
}
