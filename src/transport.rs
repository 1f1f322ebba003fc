//! Chat transport seam.
//!
//! Login/session handling, message delivery mechanics and media download live
//! outside this crate; the embedding application implements [`ChatTransport`]
//! over its transport of choice.

use std::fmt;

use async_trait::async_trait;

use crate::message::{ChatMessage, MessageRef};

/// Failure from the chat transport. Never retried by the core.
#[derive(Debug)]
pub enum TransportError {
    /// An outbound operation (send, react, clear) was rejected or failed.
    Send(String),
    /// Fetching messages or message state failed.
    Fetch(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Send(e) => write!(f, "transport send error: {e}"),
            Self::Fetch(e) => write!(f, "transport fetch error: {e}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Media payload in the transport's native encoding: base64 data plus a mime
/// type.
#[derive(Debug, Clone)]
pub struct MediaPayload {
    pub data: String,
    pub mimetype: String,
}

/// Options for outbound media.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaOptions {
    /// Deliver the media as a sticker instead of a plain attachment.
    pub as_sticker: bool,
    pub sticker_name: Option<String>,
    pub sticker_author: Option<String>,
}

/// Operations the core consumes from the chat transport.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// The most recent `limit` messages of a chat, oldest first.
    async fn fetch_recent_messages(
        &self,
        chat_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, TransportError>;

    /// Whether a message is still present in its chat.
    async fn exists_in_chat(&self, msg: &MessageRef) -> Result<bool, TransportError>;

    /// Send `text` as a reply to a specific message.
    async fn send_reply(&self, msg: &MessageRef, text: &str) -> Result<(), TransportError>;

    /// Send `text` to a chat without replying to anything.
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), TransportError>;

    async fn react(&self, msg: &MessageRef, emoji: &str) -> Result<(), TransportError>;

    async fn set_typing(&self, chat_id: &str, typing: bool) -> Result<(), TransportError>;

    /// Clear the whole message history of a chat.
    async fn clear_history(&self, chat_id: &str) -> Result<(), TransportError>;

    async fn download_media(&self, msg: &MessageRef) -> Result<MediaPayload, TransportError>;

    async fn send_media(
        &self,
        chat_id: &str,
        media: MediaPayload,
        options: MediaOptions,
    ) -> Result<(), TransportError>;
}
