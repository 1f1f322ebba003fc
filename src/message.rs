//! Chat message types shared across the crate.

use serde::{Deserialize, Serialize};

/// What an outbound action needs to target a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    pub chat_id: String,
    pub message_id: String,
}

/// A message quoted (replied to) by another message, resolved inline by the
/// transport adapter. Any field it could not resolve is simply absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotedMessage {
    pub message_id: String,
    pub sender_id: String,
    pub sender_name: Option<String>,
    pub body: String,
    pub from_self: bool,
    pub media_type: Option<String>,
}

/// An inbound chat message. Immutable once received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub message_id: String,
    pub chat_id: String,
    /// Unix timestamp in seconds.
    pub timestamp: i64,
    pub sender_id: String,
    pub sender_name: Option<String>,
    pub body: String,
    pub from_self: bool,
    pub from_group: bool,
    /// Media-type tag when the message carries an attachment,
    /// e.g. `"image"`, `"ptt"`, `"image_sticker"`.
    pub media_type: Option<String>,
    pub quoted: Option<QuotedMessage>,
    /// Whether the bot's own account is mentioned in the message.
    pub mentions_me: bool,
}

impl ChatMessage {
    pub fn msg_ref(&self) -> MessageRef {
        MessageRef {
            chat_id: self.chat_id.clone(),
            message_id: self.message_id.clone(),
        }
    }

    pub fn has_media(&self) -> bool {
        self.media_type.is_some()
    }

    /// Display name, falling back to the raw sender id.
    pub fn display_name(&self) -> &str {
        self.sender_name.as_deref().unwrap_or(&self.sender_id)
    }
}

/// Attachment tag for the prompt: the first `'_'` segment of a media type,
/// so a compound type like `"image_sticker"` contributes `"image"`.
pub fn attachment_tag(media_type: &str) -> &str {
    media_type.split('_').next().unwrap_or(media_type)
}

/// Whether a media type is a voice/audio attachment.
pub fn is_audio(media_type: &str) -> bool {
    matches!(attachment_tag(media_type), "audio" | "ptt" | "voice")
}
