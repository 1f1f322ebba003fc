//! Command routing: pure selection of exactly one action per message.

/// Action selected for an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// `fig`: convert an image (own or quoted) into a sticker.
    ImageToSticker,
    /// `img`: convert a quoted sticker back into a plain image.
    StickerToImage,
    /// `escreva`: transcribe a quoted voice message.
    TranscribeAudio,
    /// `reset`: clear the chat history.
    Reset,
    /// Default conversational exchange.
    Chat,
}

/// Command table in tie-breaking order. The first keyword the body starts
/// with (after the prefix) wins, so the order here is part of the contract.
const COMMANDS: [(&str, Action); 4] = [
    ("fig", Action::ImageToSticker),
    ("img", Action::StickerToImage),
    ("escreva", Action::TranscribeAudio),
    ("reset", Action::Reset),
];

/// Select the action for a message body.
///
/// Matching is prefix-based, not exact: `"!figure"` selects `fig` just like
/// `"!fig"` does. Possibly unintended historically, but kept on purpose.
///
/// No match is a normal outcome: the message falls through to the
/// conversational handler when `conversational` is enabled, and to a silent
/// no-op otherwise.
pub fn route(body: &str, prefix: &str, conversational: bool) -> Option<Action> {
    for (keyword, action) in COMMANDS {
        if body.starts_with(&format!("{prefix}{keyword}")) {
            return Some(action);
        }
    }
    conversational.then_some(Action::Chat)
}
