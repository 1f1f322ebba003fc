//! zapbot - relays chat messages to a conversational-completion backend.
//!
//! The crate is the orchestration core of a WhatsApp-style chat bot: it routes
//! inbound messages to a small set of media commands, turns recent chat
//! history into an ordered prompt, requests a completion with primary/fallback
//! model retry, and guards every outbound reaction or reply against the
//! originating message having been deleted in the meantime.
//!
//! The chat transport itself (session handling, delivery mechanics, media
//! download) stays outside the crate; the embedding application implements
//! [`transport::ChatTransport`] and feeds messages into [`engine::Engine`].

pub mod completion;
pub mod config;
pub mod context;
pub mod engine;
pub mod guard;
pub mod message;
pub mod router;
pub mod transcribe;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use completion::{
    CompletionApi, CompletionClient, CompletionError, HttpCompletionApi, ModelPolicy, PromptEntry,
    Role, UpstreamError,
};
pub use config::{Config, ConfigError};
pub use context::{append_to_window, build_prompt, persona};
pub use engine::Engine;
pub use message::{ChatMessage, MessageRef, QuotedMessage};
pub use router::{route, Action};
pub use transcribe::{HttpTranscriber, Transcriber, TranscriptionError};
pub use transport::{ChatTransport, MediaOptions, MediaPayload, TransportError};
