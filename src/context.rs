//! Context builder: chat history in, ordered prompt entries out.

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::warn;

use crate::completion::{PromptEntry, Role};
use crate::message::{ChatMessage, QuotedMessage, attachment_tag};

/// Append the triggering message to the fetched history, dropping any earlier
/// occurrence of its id first. The trigger is always the last, and only,
/// entry with that id; the rest keeps transport order.
pub fn append_to_window(history: Vec<ChatMessage>, trigger: ChatMessage) -> Vec<ChatMessage> {
    let mut window: Vec<ChatMessage> = history
        .into_iter()
        .filter(|m| m.message_id != trigger.message_id)
        .collect();
    window.push(trigger);
    window
}

/// Build the ordered prompt for a conversation window, one entry per message.
///
/// The bot's own messages become assistant entries with their body verbatim.
/// Everything else becomes a user entry carrying the structured record the
/// backend's few-shot examples expect.
pub fn build_prompt(window: &[ChatMessage]) -> Vec<PromptEntry> {
    window
        .iter()
        .map(|msg| {
            if msg.from_self {
                PromptEntry {
                    role: Role::Assistant,
                    content: msg.body.clone(),
                }
            } else {
                PromptEntry {
                    role: Role::User,
                    content: user_turn(msg),
                }
            }
        })
        .collect()
}

#[derive(Serialize)]
struct QuotedInfo<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<&'a str>,
    id: &'a str,
    message: &'a str,
}

#[derive(Serialize)]
struct UserTurn<'a> {
    date: String,
    user: &'a str,
    id: &'a str,
    message: &'a str,
    #[serde(rename = "isReply", skip_serializing_if = "Option::is_none")]
    is_reply: Option<bool>,
    #[serde(rename = "quotedMsg", skip_serializing_if = "Option::is_none")]
    quoted_msg: Option<QuotedInfo<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attachment: Option<&'a str>,
}

/// Serialize one inbound message as a single-element JSON array. The array
/// wrapping is contractual: the backend's few-shot examples use exactly this
/// shape.
fn user_turn(msg: &ChatMessage) -> String {
    let quoted = msg.quoted.as_ref().map(quoted_info);
    let turn = UserTurn {
        date: format_timestamp(msg.timestamp),
        user: msg.display_name(),
        id: &msg.sender_id,
        message: &msg.body,
        is_reply: quoted.is_some().then_some(true),
        quoted_msg: quoted,
        attachment: msg.media_type.as_deref().map(attachment_tag),
    };

    serde_json::to_string(&[turn]).unwrap_or_else(|e| {
        warn!("failed to encode user turn for {}: {e}", msg.message_id);
        msg.body.clone()
    })
}

fn quoted_info(quoted: &QuotedMessage) -> QuotedInfo<'_> {
    QuotedInfo {
        user: quoted.sender_name.as_deref(),
        id: &quoted.sender_id,
        message: &quoted.body,
    }
}

fn format_timestamp(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|utc| utc.with_timezone(&Local).format("%d/%m/%Y, %H:%M:%S").to_string())
        .unwrap_or_default()
}

/// System preamble for the completion backend: persona framing plus the
/// output-format constraint. User turns arrive as single-element JSON arrays;
/// the preamble pins the reply format to plain text so the model does not echo
/// that shape back.
pub fn persona(bot_name: &str) -> String {
    format!(
        "Now you're a person called {bot_name} chatting on WhatsApp. \
         {bot_name} is a real person with preferences, opinions and feelings, \
         answers informally and uses emojis only when really necessary. \
         Each user turn arrives as a JSON array like \
         '[{{\"date\":\"05/10/2023, 16:49:23\",\"user\":\"Ramon\",\"message\":\"hi {bot_name}\"}}]'. \
         Respond only to the last message sent. \
         Never answer inside that JSON shape yourself. \
         Answer with plain text only, like: 'Yo, gd?'. \
         Now act as {bot_name} on WhatsApp."
    )
}
