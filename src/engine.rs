//! Handlers: every inbound message gets exactly one action, and every side
//! effect of that action goes through the revocation guard.

use std::future::Future;
use std::sync::Arc;

use tracing::{info, warn};

use crate::completion::{CompletionApi, CompletionClient, ModelPolicy};
use crate::config::Config;
use crate::context::{append_to_window, build_prompt, persona};
use crate::guard;
use crate::message::{ChatMessage, MessageRef, is_audio};
use crate::router::{Action, route};
use crate::transcribe::Transcriber;
use crate::transport::{ChatTransport, MediaOptions, TransportError};

const NOT_AN_IMAGE: &str = "❌ Não é uma imagem.";
const NOT_A_STICKER: &str = "❌ Não é uma figurinha.";
const NOT_AN_AUDIO: &str = "❌ Não é um audio.";
const RESET_DONE: &str = "Resetado ✅";

/// The orchestration core: command dispatch plus the conversational exchange.
pub struct Engine {
    config: Config,
    transport: Arc<dyn ChatTransport>,
    completion: CompletionClient,
    transcriber: Arc<dyn Transcriber>,
    policy: ModelPolicy,
}

impl Engine {
    pub fn new(
        config: Config,
        transport: Arc<dyn ChatTransport>,
        api: Arc<dyn CompletionApi>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Self {
        let completion = CompletionClient::new(api, persona(&config.bot_name));
        let policy = ModelPolicy::new(config.primary_model.clone(), config.fallback_models.clone());
        Self {
            config,
            transport,
            completion,
            transcriber,
            policy,
        }
    }

    /// Entry point for one inbound message. Each call is an independent task;
    /// everything inside runs strictly sequentially.
    pub async fn handle_message(&self, msg: ChatMessage) {
        if msg.from_group && !self.config.groups {
            return;
        }

        match route(&msg.body, &self.config.command_prefix, self.config.conversational) {
            Some(Action::ImageToSticker) => self.image_to_sticker(&msg).await,
            Some(Action::StickerToImage) => self.sticker_to_image(&msg).await,
            Some(Action::TranscribeAudio) => self.transcribe_audio(&msg).await,
            Some(Action::Reset) => self.reset(&msg).await,
            Some(Action::Chat) => self.chat(&msg).await,
            None => {}
        }
    }

    /// `fig`: convert the quoted image, or the message's own media, into a
    /// sticker.
    async fn image_to_sticker(&self, msg: &ChatMessage) {
        let transport = self.transport.as_ref();
        let origin = msg.msg_ref();
        guard::indicate_pending(transport, &origin).await;

        let (target, has_media) = match &msg.quoted {
            Some(quoted) => (
                MessageRef {
                    chat_id: msg.chat_id.clone(),
                    message_id: quoted.message_id.clone(),
                },
                quoted.media_type.is_some(),
            ),
            None => (origin.clone(), msg.has_media()),
        };

        if !has_media {
            guard::indicate_error(transport, &origin, Some(NOT_AN_IMAGE)).await;
            return;
        }

        let options = MediaOptions {
            as_sticker: true,
            sticker_name: Some(format!("Criada por {}", msg.display_name())),
            sticker_author: Some(format!("Bot by {}", self.config.author)),
        };
        let result: Result<(), TransportError> = async {
            let media = transport.download_media(&target).await?;
            transport.send_media(&msg.chat_id, media, options).await
        }
        .await;

        match result {
            Ok(()) => guard::indicate_success(transport, &origin).await,
            Err(e) => {
                warn!("image to sticker failed: {e}");
                guard::indicate_error(transport, &origin, None).await;
            }
        }
    }

    /// `img`: convert a quoted sticker back into a plain image.
    async fn sticker_to_image(&self, msg: &ChatMessage) {
        let transport = self.transport.as_ref();
        let origin = msg.msg_ref();

        let Some(quoted) = msg.quoted.as_ref().filter(|q| q.media_type.is_some()) else {
            guard::indicate_error(transport, &origin, Some(NOT_A_STICKER)).await;
            return;
        };

        guard::indicate_pending(transport, &origin).await;

        let target = MessageRef {
            chat_id: msg.chat_id.clone(),
            message_id: quoted.message_id.clone(),
        };
        let result: Result<(), TransportError> = async {
            let media = transport.download_media(&target).await?;
            transport
                .send_media(&msg.chat_id, media, MediaOptions::default())
                .await
        }
        .await;

        match result {
            Ok(()) => guard::indicate_success(transport, &origin).await,
            Err(e) => {
                warn!("sticker to image failed: {e}");
                guard::indicate_error(transport, &origin, None).await;
            }
        }
    }

    /// `escreva`: transcribe a quoted voice message and reply with the text.
    async fn transcribe_audio(&self, msg: &ChatMessage) {
        let transport = self.transport.as_ref();
        let origin = msg.msg_ref();

        let Some(quoted) = msg
            .quoted
            .as_ref()
            .filter(|q| q.media_type.as_deref().is_some_and(is_audio))
        else {
            guard::indicate_error(transport, &origin, Some(NOT_AN_AUDIO)).await;
            return;
        };

        guard::indicate_pending(transport, &origin).await;

        let quoted_ref = MessageRef {
            chat_id: msg.chat_id.clone(),
            message_id: quoted.message_id.clone(),
        };
        let media = match transport.download_media(&quoted_ref).await {
            Ok(media) => media,
            Err(e) => {
                warn!("failed to download quoted audio: {e}");
                guard::indicate_error(transport, &origin, None).await;
                return;
            }
        };

        let transcript = self
            .with_typing(&msg.chat_id, self.transcriber.transcribe(&media.data))
            .await;

        match transcript {
            Ok(text) => {
                let response = format!("No áudio foi dito: \n\n{text}");
                if let Err(e) = guard::reply(transport, &quoted_ref, &response).await {
                    warn!("failed to deliver transcript: {e}");
                    guard::indicate_error(transport, &origin, None).await;
                    return;
                }
                guard::indicate_success(transport, &origin).await;
            }
            Err(e) => {
                warn!("transcription failed: {e}");
                guard::indicate_error(transport, &origin, None).await;
            }
        }
    }

    /// `reset`: clear the chat history.
    async fn reset(&self, msg: &ChatMessage) {
        let transport = self.transport.as_ref();

        match transport.clear_history(&msg.chat_id).await {
            Ok(()) => {
                // The confirmation itself is not revocation-checked.
                if let Err(e) = transport.send_message(&msg.chat_id, RESET_DONE).await {
                    warn!("failed to send reset confirmation: {e}");
                }
            }
            Err(e) => {
                warn!("failed to clear chat history: {e}");
                guard::indicate_error(transport, &msg.msg_ref(), None).await;
            }
        }
    }

    /// Conversational exchange: windowed history in, completion reply out.
    async fn chat(&self, msg: &ChatMessage) {
        if msg.from_group && !self.is_for_me(msg) {
            return;
        }

        let transport = self.transport.as_ref();
        let origin = msg.msg_ref();

        let history = match transport
            .fetch_recent_messages(&msg.chat_id, self.config.history_limit)
            .await
        {
            Ok(history) => history,
            Err(e) => {
                warn!("failed to fetch chat history: {e}");
                guard::indicate_error(transport, &origin, None).await;
                return;
            }
        };

        let window = append_to_window(history, msg.clone());
        let prompt = build_prompt(&window);
        info!("requesting completion for chat {} ({} entries)", msg.chat_id, prompt.len());

        let outcome = self
            .with_typing(&msg.chat_id, self.completion.request(&prompt, &self.policy))
            .await;

        match outcome {
            Ok(text) => {
                if let Err(e) = guard::reply(transport, &origin, &text).await {
                    warn!("failed to deliver reply: {e}");
                }
            }
            Err(e) => {
                warn!("completion failed: {e}");
                guard::indicate_error(transport, &origin, None).await;
            }
        }
    }

    /// Whether a group message addresses the bot: a mention, the bot's name
    /// in the body, or a reply to one of the bot's own messages.
    fn is_for_me(&self, msg: &ChatMessage) -> bool {
        msg.mentions_me
            || msg
                .body
                .to_lowercase()
                .contains(&self.config.bot_name.to_lowercase())
            || msg.quoted.as_ref().is_some_and(|q| q.from_self)
    }

    /// Scoped typing indicator: set before `fut` runs, cleared once it
    /// settles, whichever way it settles.
    async fn with_typing<T>(&self, chat_id: &str, fut: impl Future<Output = T>) -> T {
        if let Err(e) = self.transport.set_typing(chat_id, true).await {
            warn!("failed to set typing indicator: {e}");
        }
        let out = fut.await;
        if let Err(e) = self.transport.set_typing(chat_id, false).await {
            warn!("failed to clear typing indicator: {e}");
        }
        out
    }
}
