//! In-process test doubles for the port traits.
//!
//! Compiled for this crate's tests and, behind the `test-util` feature, for
//! other crates' tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use parley_types::chat::ChatId;
use parley_types::error::{StoreError, TransportError};
use parley_types::llm::{AudioClip, CompletionRequest, CompletionResponse, LlmError, Usage};
use parley_types::telegram::{ChatAction, ParseMode, TelegramFile};

use crate::llm::{LlmProvider, Transcriber};
use crate::notify::AdminNotifier;
use crate::storage::KvStore;
use crate::transport::ChatTransport;

/// A store whose every operation fails with a connection error.
#[derive(Debug, Default)]
pub struct FailingKvStore;

fn unreachable_store() -> StoreError {
    StoreError::Connection("connection refused".to_string())
}

impl KvStore for FailingKvStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(unreachable_store())
    }

    async fn get_refresh(&self, _key: &str, _ttl: Duration) -> Result<Option<String>, StoreError> {
        Err(unreachable_store())
    }

    async fn set_ex(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), StoreError> {
        Err(unreachable_store())
    }

    async fn incr_with_expiry(&self, _key: &str, _window: Duration) -> Result<u64, StoreError> {
        Err(unreachable_store())
    }

    async fn delete(&self, _key: &str) -> Result<(), StoreError> {
        Err(unreachable_store())
    }

    async fn list_push(&self, _key: &str, _value: &str) -> Result<u64, StoreError> {
        Err(unreachable_store())
    }

    async fn list_all(&self, _key: &str) -> Result<Vec<String>, StoreError> {
        Err(unreachable_store())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: ChatId,
    pub text: String,
    pub parse_mode: Option<ParseMode>,
}

/// Records outbound traffic and serves voice files from memory.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<SentMessage>>,
    actions: Mutex<Vec<(ChatId, ChatAction)>>,
    files: Mutex<HashMap<String, (TelegramFile, Vec<u8>)>>,
    reject_html: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose HTML sends fail with a parse error; plain sends succeed.
    pub fn rejecting_html() -> Self {
        Self {
            reject_html: true,
            ..Self::default()
        }
    }

    /// Serve `bytes` for `file_id`, reporting `file_size` from `getFile`.
    pub fn with_file(self, file_id: &str, file_size: Option<u64>, bytes: Vec<u8>) -> Self {
        let file = TelegramFile {
            file_id: file_id.to_string(),
            file_size,
            file_path: Some(format!("voice/{file_id}.oga")),
        };
        self.files
            .lock()
            .unwrap()
            .insert(file_id.to_string(), (file, bytes));
        self
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|m| m.text).collect()
    }

    pub fn actions(&self) -> Vec<(ChatId, ChatAction)> {
        self.actions.lock().unwrap().clone()
    }
}

impl ChatTransport for RecordingTransport {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        parse_mode: Option<ParseMode>,
    ) -> Result<(), TransportError> {
        if self.reject_html && parse_mode == Some(ParseMode::Html) {
            return Err(TransportError::Api {
                code: Some(400),
                description: "Bad Request: can't parse entities".to_string(),
            });
        }
        self.sent.lock().unwrap().push(SentMessage {
            chat_id,
            text: text.to_string(),
            parse_mode,
        });
        Ok(())
    }

    async fn send_chat_action(&self, chat_id: ChatId, action: ChatAction) -> Result<(), TransportError> {
        self.actions.lock().unwrap().push((chat_id, action));
        Ok(())
    }

    async fn get_file(&self, file_id: &str) -> Result<TelegramFile, TransportError> {
        self.files
            .lock()
            .unwrap()
            .get(file_id)
            .map(|(file, _)| file.clone())
            .ok_or_else(|| TransportError::Api {
                code: Some(400),
                description: "Bad Request: invalid file_id".to_string(),
            })
    }

    async fn download_file(&self, file_path: &str) -> Result<Vec<u8>, TransportError> {
        self.files
            .lock()
            .unwrap()
            .values()
            .find(|(file, _)| file.file_path.as_deref() == Some(file_path))
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| TransportError::FileUnavailable(file_path.to_string()))
    }
}

#[derive(Debug, Clone)]
enum Scripted {
    Reply(String),
    Fail,
}

impl Scripted {
    fn produce(&self) -> Result<String, LlmError> {
        match self {
            Scripted::Reply(text) => Ok(text.clone()),
            Scripted::Fail => Err(LlmError::Provider {
                message: "upstream unavailable".to_string(),
            }),
        }
    }
}

/// A completion provider that plays back scripted replies and records requests.
///
/// Queued replies are used first; after that the fallback repeats.
#[derive(Debug)]
pub struct ScriptedLlm {
    queue: Mutex<VecDeque<Scripted>>,
    fallback: Scripted,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn replying(text: &str) -> Self {
        Self::with_fallback(Scripted::Reply(text.to_string()))
    }

    pub fn failing() -> Self {
        Self::with_fallback(Scripted::Fail)
    }

    fn with_fallback(fallback: Scripted) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a one-off reply ahead of the fallback.
    pub fn then_reply(self, text: &str) -> Self {
        self.queue
            .lock()
            .unwrap()
            .push_back(Scripted::Reply(text.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self
            .queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        let content = next.produce()?;
        Ok(CompletionResponse {
            id: "scripted-1".to_string(),
            content,
            model: request.model.clone(),
            usage: Usage::default(),
        })
    }
}

/// A transcriber that returns a fixed transcript (or fails).
#[derive(Debug)]
pub struct ScriptedTranscriber {
    outcome: Scripted,
    clips: Mutex<Vec<usize>>,
}

impl ScriptedTranscriber {
    pub fn hearing(text: &str) -> Self {
        Self {
            outcome: Scripted::Reply(text.to_string()),
            clips: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            outcome: Scripted::Fail,
            clips: Mutex::new(Vec::new()),
        }
    }

    /// Byte lengths of the clips received so far.
    pub fn clip_sizes(&self) -> Vec<usize> {
        self.clips.lock().unwrap().clone()
    }
}

impl Transcriber for ScriptedTranscriber {
    async fn transcribe(&self, clip: &AudioClip) -> Result<String, LlmError> {
        self.clips.lock().unwrap().push(clip.bytes.len());
        self.outcome.produce()
    }
}

/// Collects admin notices.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<String> {
        self.notices.lock().unwrap().clone()
    }
}

impl AdminNotifier for RecordingNotifier {
    async fn notify(&self, text: &str) -> Result<(), TransportError> {
        self.notices.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
