//! Application state wiring the orchestrator to its concrete adapters.
//!
//! `SessionOrchestrator` is generic over every port; AppState pins it to the
//! infra implementations selected by configuration.

use std::sync::Arc;

use secrecy::SecretString;
use tracing::info;

use parley_core::orchestrator::{Collaborators, ReplySettings, SessionOrchestrator};
use parley_infra::config::{require_bot_token, validate};
use parley_infra::llm::{OpenAiCompatibleProvider, WhisperTranscriber, create_provider, create_transcriber};
use parley_infra::store::ConfiguredStore;
use parley_infra::telegram::notify::build_admin_notifier;
use parley_infra::telegram::{TelegramAdminNotifier, TelegramClient};
use parley_types::config::BotConfig;

/// The orchestrator generics pinned to infra implementations.
pub type Orchestrator = SessionOrchestrator<
    ConfiguredStore,
    TelegramClient,
    OpenAiCompatibleProvider,
    WhisperTranscriber,
    Option<TelegramAdminNotifier>,
>;

/// Shared state for the webhook server and the polling loop.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// Expected `X-Telegram-Bot-Api-Secret-Token` value, if any.
    pub webhook_secret: Option<SecretString>,
}

impl AppState {
    /// Connect the store and build every client named in `config`.
    pub async fn init(config: &BotConfig) -> anyhow::Result<Self> {
        validate(config)?;
        let token = require_bot_token(config)?.clone();

        let store = ConfiguredStore::connect(&config.store).await?;
        info!(backend = ?store.backend(), "store connected");

        let transport = TelegramClient::new(token, &config.telegram.api_base)?;
        let llm = create_provider(&config.llm)?;
        let transcriber = create_transcriber(&config.llm)?;
        let notifier = build_admin_notifier(&config.telegram)?;
        if notifier.is_none() {
            info!("admin notifications disabled (set LOGAPIKEY and ADMINID to enable)");
        }

        let settings = ReplySettings {
            model: config.llm.text_model.clone(),
            system_prompt: config.llm.system_prompt.clone(),
        };
        let orchestrator = SessionOrchestrator::new(
            Arc::new(store),
            config.limits,
            settings,
            Collaborators {
                transport,
                llm,
                transcriber,
                notifier,
            },
        );

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            webhook_secret: config.telegram.webhook_secret.clone(),
        })
    }
}
