//! Per-message session orchestration.
//!
//! `SessionOrchestrator::handle_update` runs one inbound message through:
//! rate check → command dispatch or history load → completion → history
//! save → render → chunked delivery. Every failure ends at a single error
//! boundary that tells the user something went wrong, logs, and notifies
//! the admin; nothing propagates to the caller.

pub mod commands;
pub mod voice;

use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, debug, error, info, info_span, warn};

use parley_types::chat::{ChatId, Turn};
use parley_types::config::LimitsConfig;
use parley_types::error::{BotError, TransportError, VoiceError};
use parley_types::llm::CompletionRequest;
use parley_types::task::Task;
use parley_types::telegram::{ChatAction, Message, ParseMode, Update, Voice};

use crate::conversation::ConversationStore;
use crate::delivery::{deliver, split};
use crate::limiter::{RateDecision, RateLimiter, SLOW_DOWN_NOTICE};
use crate::llm::{LlmProvider, Transcriber};
use crate::notify::AdminNotifier;
use crate::render::render;
use crate::storage::KvStore;
use crate::tasks::TaskList;
use crate::transport::ChatTransport;

use self::commands::Command;

pub const GENERIC_ERROR: &str = "Error: Unable to process your request.";
pub const COMPLETION_FAILED: &str = "I am having trouble processing your request right now.";
pub const UNSUPPORTED_MESSAGE: &str = "Please send a text or voice message.";

/// How a single update ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The update carried no message.
    Ignored,
    /// Rejected by the rate limiter.
    Blocked,
    /// A slash command ran and was acknowledged.
    CommandHandled,
    /// A model reply was delivered in `chunks` messages (0 for an empty reply).
    Delivered { chunks: usize },
    /// Neither text nor voice; the user was told what is supported.
    Unsupported,
    /// The voice note was too large, empty, or could not be transcribed.
    VoiceRejected,
    /// The completion provider failed; the user got an apology.
    CompletionFailed,
    /// Unexpected error; the user got the generic error notice.
    Failed,
}

/// Model-facing settings for replies.
#[derive(Debug, Clone, Default)]
pub struct ReplySettings {
    /// Model id sent with every request; empty lets the provider choose.
    pub model: String,
    /// Prepended to every request, never stored in history.
    pub system_prompt: Option<String>,
}

/// The outbound collaborators an orchestrator drives.
pub struct Collaborators<T, L, W, N> {
    pub transport: T,
    pub llm: L,
    pub transcriber: W,
    pub notifier: N,
}

pub struct SessionOrchestrator<S, T, L, W, N> {
    limiter: RateLimiter<S>,
    conversations: ConversationStore<S>,
    tasks: TaskList<S>,
    transport: T,
    llm: L,
    transcriber: W,
    notifier: N,
    settings: ReplySettings,
    chunk_limit: usize,
    max_voice_bytes: u64,
}

impl<S, T, L, W, N> SessionOrchestrator<S, T, L, W, N>
where
    S: KvStore,
    T: ChatTransport,
    L: LlmProvider,
    W: Transcriber,
    N: AdminNotifier,
{
    pub fn new(
        store: Arc<S>,
        limits: LimitsConfig,
        settings: ReplySettings,
        collaborators: Collaborators<T, L, W, N>,
    ) -> Self {
        Self {
            limiter: RateLimiter::new(
                store.clone(),
                limits.max_messages_per_window,
                Duration::from_secs(limits.rate_limit_window_secs),
            ),
            conversations: ConversationStore::new(
                store.clone(),
                limits.max_turns(),
                Duration::from_secs(limits.inactivity_timeout_secs),
            ),
            tasks: TaskList::new(store),
            transport: collaborators.transport,
            llm: collaborators.llm,
            transcriber: collaborators.transcriber,
            notifier: collaborators.notifier,
            settings,
            chunk_limit: limits.chunk_limit,
            max_voice_bytes: limits.max_voice_file_bytes,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn llm(&self) -> &L {
        &self.llm
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn conversations(&self) -> &ConversationStore<S> {
        &self.conversations
    }

    pub fn tasks(&self) -> &TaskList<S> {
        &self.tasks
    }

    /// Process one inbound update to completion. Never fails.
    pub async fn handle_update(&self, update: &Update) -> Outcome {
        let Some(message) = update.message.as_ref() else {
            warn!(update_id = ?update.update_id, "received update without message");
            return Outcome::Ignored;
        };

        let span = info_span!(
            "handle_message",
            chat.id = %message.chat.id,
            message.id = ?message.message_id,
        );
        async move {
            match self.process(message).await {
                Ok(outcome) => {
                    debug!(?outcome, "message handled");
                    outcome
                }
                Err(e) => {
                    self.report_failure(message, &e).await;
                    Outcome::Failed
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn process(&self, message: &Message) -> Result<Outcome, BotError> {
        let chat_id = message.chat.id;

        if let RateDecision::Blocked { notify } = self.limiter.check(chat_id).await {
            warn!(chat_id = %chat_id, "rate limit exceeded");
            if notify {
                if let Err(e) = self.transport.send_message(chat_id, SLOW_DOWN_NOTICE, None).await {
                    warn!(chat_id = %chat_id, error = %e, "failed to send slow-down notice");
                }
            }
            return Ok(Outcome::Blocked);
        }

        if let Some(text) = message.text.as_deref() {
            if let Some(command) = Command::parse(text) {
                self.run_command(chat_id, command).await?;
                return Ok(Outcome::CommandHandled);
            }
            let outcome = self.converse(chat_id, text.to_string()).await?;
            self.notify_admin(&format!("[message] {}", message_dump(message)))
                .await;
            info!(chat_id = %chat_id, "processed text message");
            return Ok(outcome);
        }

        if let Some(voice) = message.voice.as_ref() {
            return self.handle_voice(chat_id, voice).await;
        }

        warn!(chat_id = %chat_id, "unsupported message type");
        self.transport
            .send_message(chat_id, UNSUPPORTED_MESSAGE, None)
            .await?;
        Ok(Outcome::Unsupported)
    }

    async fn run_command(&self, chat_id: ChatId, command: Command) -> Result<(), BotError> {
        debug!(chat_id = %chat_id, ?command, "running command");
        match command {
            Command::Start => {
                self.conversations.clear(chat_id).await?;
                self.send_plain(chat_id, commands::WELCOME).await?;
                info!(chat_id = %chat_id, "started new conversation");
            }
            Command::Clear => {
                self.conversations.clear(chat_id).await?;
                self.send_plain(chat_id, commands::HISTORY_CLEARED).await?;
                info!(chat_id = %chat_id, "cleared conversation history");
            }
            Command::AddTask { time, description } => {
                let task = Task::new(description, time);
                self.tasks.add(chat_id, &task).await?;
                self.send_plain(chat_id, &commands::task_added(&task)).await?;
            }
            Command::AddTaskUsage => {
                self.send_plain(chat_id, commands::ADD_TASK_USAGE).await?;
            }
            Command::Tasks => {
                let tasks = self.tasks.list(chat_id).await?;
                if tasks.is_empty() {
                    self.send_plain(chat_id, commands::NO_TASKS).await?;
                } else {
                    self.send_html(chat_id, &commands::format_tasks(&tasks)).await?;
                }
            }
            Command::Orbit => {
                let tasks = self.tasks.list(chat_id).await?;
                if tasks.is_empty() {
                    self.send_plain(chat_id, commands::EMPTY_ORBIT).await?;
                } else {
                    self.send_html(chat_id, &commands::format_orbit(&tasks)).await?;
                }
            }
            Command::ClearOrbit => {
                self.tasks.clear(chat_id).await?;
                self.send_plain(chat_id, commands::ORBIT_CLEARED).await?;
            }
            Command::Unknown(name) => {
                debug!(chat_id = %chat_id, command = %name, "unknown command");
                self.send_plain(chat_id, commands::UNKNOWN_COMMAND).await?;
            }
        }
        Ok(())
    }

    async fn handle_voice(&self, chat_id: ChatId, voice: &Voice) -> Result<Outcome, BotError> {
        self.show_typing(chat_id).await;

        let transcript = voice::transcribe_voice(
            &self.transport,
            &self.transcriber,
            voice,
            self.max_voice_bytes,
        )
        .await;

        let transcript = match transcript {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!(chat_id = %chat_id, "voice note produced an empty transcript");
                return Ok(Outcome::VoiceRejected);
            }
            Err(VoiceError::TooLarge { size, limit }) => {
                warn!(chat_id = %chat_id, size, limit, "voice note too large");
                self.send_plain(chat_id, voice::VOICE_TOO_LARGE).await?;
                return Ok(Outcome::VoiceRejected);
            }
            Err(e) => {
                error!(chat_id = %chat_id, error = %e, "error transcribing voice message");
                self.send_plain(chat_id, voice::TRANSCRIPTION_FAILED).await?;
                return Ok(Outcome::VoiceRejected);
            }
        };

        let outcome = self.converse(chat_id, transcript).await?;
        info!(chat_id = %chat_id, "processed voice message");
        Ok(outcome)
    }

    /// Append the user's turn, ask the model, persist, and deliver the reply.
    async fn converse(&self, chat_id: ChatId, user_text: String) -> Result<Outcome, BotError> {
        self.show_typing(chat_id).await;

        let mut history = self.conversations.get(chat_id).await;
        history.push(Turn::user(user_text));
        let excess = history.len().saturating_sub(self.conversations.max_turns());
        history.drain(..excess);

        let mut request = CompletionRequest::new(history.clone())
            .with_system(self.settings.system_prompt.clone());
        request.model = self.settings.model.clone();

        let span = info_span!(
            "gen_ai.chat",
            gen_ai.provider.name = self.llm.name(),
            gen_ai.request.model = %request.model,
        );
        let response = match self.llm.complete(&request).instrument(span).await {
            Ok(response) => response,
            Err(e) => {
                error!(chat_id = %chat_id, provider = self.llm.name(), error = %e, "completion failed");
                self.send_plain(chat_id, COMPLETION_FAILED).await?;
                return Ok(Outcome::CompletionFailed);
            }
        };
        debug!(
            chat_id = %chat_id,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "completion received"
        );

        history.push(Turn::assistant(response.content.clone()));
        if let Err(e) = self.conversations.save(chat_id, &history).await {
            warn!(chat_id = %chat_id, error = %e, "failed to save conversation history");
        }

        if response.content.trim().is_empty() {
            warn!(chat_id = %chat_id, "model returned an empty reply, nothing to send");
            return Ok(Outcome::Delivered { chunks: 0 });
        }

        let chunks = self.send_rendered(chat_id, &response.content).await?;
        Ok(Outcome::Delivered { chunks })
    }

    async fn send_rendered(&self, chat_id: ChatId, content: &str) -> Result<usize, TransportError> {
        let markup = render(content);
        let chunks = split(&markup, self.chunk_limit);
        let transport = &self.transport;
        deliver(chat_id, &chunks, move |id, chunk| async move {
            transport
                .send_message(id, &chunk, Some(ParseMode::Html))
                .await
        })
        .await
    }

    async fn send_plain(&self, chat_id: ChatId, text: &str) -> Result<(), TransportError> {
        self.transport.send_message(chat_id, text, None).await
    }

    async fn send_html(&self, chat_id: ChatId, text: &str) -> Result<(), TransportError> {
        self.transport
            .send_message(chat_id, text, Some(ParseMode::Html))
            .await
    }

    async fn show_typing(&self, chat_id: ChatId) {
        if let Err(e) = self
            .transport
            .send_chat_action(chat_id, ChatAction::Typing)
            .await
        {
            debug!(chat_id = %chat_id, error = %e, "failed to send typing action");
        }
    }

    async fn notify_admin(&self, text: &str) {
        if let Err(e) = self.notifier.notify(text).await {
            warn!(error = %e, "failed to notify admin");
        }
    }

    async fn report_failure(&self, message: &Message, failure: &BotError) {
        let chat_id = message.chat.id;
        error!(chat_id = %chat_id, error = %failure, "error handling message");
        if let Err(e) = self.send_plain(chat_id, GENERIC_ERROR).await {
            warn!(chat_id = %chat_id, error = %e, "failed to send error notice");
        }
        self.notify_admin(&format!(
            "[error] {failure}\nMessage: {}",
            message_dump(message)
        ))
        .await;
    }
}

fn message_dump(message: &Message) -> String {
    serde_json::to_string(message).unwrap_or_else(|_| format!("{{\"chat\":{}}}", message.chat.id))
}
