//! Shared mocks for unit tests: scripted transport, completion backend and
//! transcriber that record every call for assertions.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::completion::{CompletionApi, PromptEntry, UpstreamError};
use crate::message::{ChatMessage, MessageRef};
use crate::transcribe::{Transcriber, TranscriptionError};
use crate::transport::{ChatTransport, MediaOptions, MediaPayload, TransportError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentReply {
    pub message_id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    pub message_id: String,
    pub emoji: String,
}

/// Transport mock: `history` doubles as the chat's current message set, so it
/// backs both `fetch_recent_messages` and the revocation check.
#[derive(Default)]
pub struct MockTransport {
    history: Mutex<Vec<ChatMessage>>,
    replies: Mutex<Vec<SentReply>>,
    messages: Mutex<Vec<SentMessage>>,
    reactions: Mutex<Vec<Reaction>>,
    typing_events: Mutex<Vec<bool>>,
    cleared_chats: Mutex<Vec<String>>,
    sent_media: Mutex<Vec<(String, MediaOptions)>>,
    media: Mutex<Option<MediaPayload>>,
    fail_exists: AtomicBool,
    fail_clear: AtomicBool,
    fail_download: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_history(&self, msgs: Vec<ChatMessage>) {
        *self.history.lock().unwrap() = msgs;
    }

    pub fn set_media(&self, payload: MediaPayload) {
        *self.media.lock().unwrap() = Some(payload);
    }

    pub fn fail_exists_check(&self) {
        self.fail_exists.store(true, Ordering::SeqCst);
    }

    pub fn fail_clear_history(&self) {
        self.fail_clear.store(true, Ordering::SeqCst);
    }

    pub fn fail_media_download(&self) {
        self.fail_download.store(true, Ordering::SeqCst);
    }

    pub fn replies(&self) -> Vec<SentReply> {
        self.replies.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<SentMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub fn reactions(&self) -> Vec<Reaction> {
        self.reactions.lock().unwrap().clone()
    }

    pub fn typing_events(&self) -> Vec<bool> {
        self.typing_events.lock().unwrap().clone()
    }

    pub fn cleared_chats(&self) -> Vec<String> {
        self.cleared_chats.lock().unwrap().clone()
    }

    pub fn sent_media(&self) -> Vec<(String, MediaOptions)> {
        self.sent_media.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn fetch_recent_messages(
        &self,
        chat_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, TransportError> {
        let all = self.history.lock().unwrap();
        let msgs: Vec<ChatMessage> = all
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect();
        let start = msgs.len().saturating_sub(limit);
        Ok(msgs[start..].to_vec())
    }

    async fn exists_in_chat(&self, msg: &MessageRef) -> Result<bool, TransportError> {
        if self.fail_exists.load(Ordering::SeqCst) {
            return Err(TransportError::Fetch("scripted fetch failure".to_string()));
        }
        Ok(self
            .history
            .lock()
            .unwrap()
            .iter()
            .any(|m| m.chat_id == msg.chat_id && m.message_id == msg.message_id))
    }

    async fn send_reply(&self, msg: &MessageRef, text: &str) -> Result<(), TransportError> {
        self.replies.lock().unwrap().push(SentReply {
            message_id: msg.message_id.clone(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), TransportError> {
        self.messages.lock().unwrap().push(SentMessage {
            chat_id: chat_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn react(&self, msg: &MessageRef, emoji: &str) -> Result<(), TransportError> {
        self.reactions.lock().unwrap().push(Reaction {
            message_id: msg.message_id.clone(),
            emoji: emoji.to_string(),
        });
        Ok(())
    }

    async fn set_typing(&self, _chat_id: &str, typing: bool) -> Result<(), TransportError> {
        self.typing_events.lock().unwrap().push(typing);
        Ok(())
    }

    async fn clear_history(&self, chat_id: &str) -> Result<(), TransportError> {
        if self.fail_clear.load(Ordering::SeqCst) {
            return Err(TransportError::Send("scripted clear failure".to_string()));
        }
        self.cleared_chats.lock().unwrap().push(chat_id.to_string());
        self.history.lock().unwrap().retain(|m| m.chat_id != chat_id);
        Ok(())
    }

    async fn download_media(&self, _msg: &MessageRef) -> Result<MediaPayload, TransportError> {
        if self.fail_download.load(Ordering::SeqCst) {
            return Err(TransportError::Fetch("scripted download failure".to_string()));
        }
        Ok(self.media.lock().unwrap().clone().unwrap_or(MediaPayload {
            data: "ZmFrZQ==".to_string(),
            mimetype: "application/octet-stream".to_string(),
        }))
    }

    async fn send_media(
        &self,
        chat_id: &str,
        _media: MediaPayload,
        options: MediaOptions,
    ) -> Result<(), TransportError> {
        self.sent_media
            .lock()
            .unwrap()
            .push((chat_id.to_string(), options));
        Ok(())
    }
}

/// Completion backend mock with a queue of scripted outcomes.
#[derive(Default)]
pub struct MockCompletionApi {
    responses: Mutex<VecDeque<Result<String, UpstreamError>>>,
    calls: Mutex<Vec<(String, Vec<PromptEntry>)>>,
}

impl MockCompletionApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_ok(&self, text: &str) {
        self.responses.lock().unwrap().push_back(Ok(text.to_string()));
    }

    pub fn queue_err(&self, status: &str) {
        self.responses.lock().unwrap().push_back(Err(UpstreamError {
            status: status.to_string(),
            message: "scripted failure".to_string(),
        }));
    }

    pub fn models_called(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(model, _)| model.clone())
            .collect()
    }

    pub fn last_prompt(&self) -> Vec<PromptEntry> {
        self.calls
            .lock()
            .unwrap()
            .last()
            .map(|(_, entries)| entries.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CompletionApi for MockCompletionApi {
    async fn complete_chat(
        &self,
        model: &str,
        entries: &[PromptEntry],
    ) -> Result<String, UpstreamError> {
        self.calls
            .lock()
            .unwrap()
            .push((model.to_string(), entries.to_vec()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(UpstreamError {
                    status: "exhausted".to_string(),
                    message: "no scripted response left".to_string(),
                })
            })
    }
}

/// Transcriber mock: records payloads, answers with a fixed transcript or a
/// scripted upstream failure.
#[derive(Default)]
pub struct MockTranscriber {
    calls: Mutex<Vec<String>>,
    transcript: Mutex<Option<String>>,
}

impl MockTranscriber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_transcript(&self, text: &str) {
        *self.transcript.lock().unwrap() = Some(text.to_string());
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn payloads(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, audio_b64: &str) -> Result<String, TranscriptionError> {
        self.calls.lock().unwrap().push(audio_b64.to_string());
        match self.transcript.lock().unwrap().clone() {
            Some(text) => Ok(text),
            None => Err(TranscriptionError::Upstream {
                status: "500 scripted".to_string(),
                message: "no transcript scripted".to_string(),
            }),
        }
    }
}
