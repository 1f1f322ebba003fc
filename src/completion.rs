//! Completion client: primary/fallback model retry and output normalization.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Role of a prompt entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged unit of conversational context sent to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptEntry {
    pub role: Role,
    pub content: String,
}

/// Primary model plus a non-empty set of fallback models.
///
/// Fallback selection is uniform-random rather than ordered: determinism is
/// traded for spreading load across fallbacks when the primary is down.
#[derive(Debug, Clone)]
pub struct ModelPolicy {
    pub primary: String,
    pub fallbacks: Vec<String>,
}

impl ModelPolicy {
    pub fn new(primary: String, fallbacks: Vec<String>) -> Self {
        Self { primary, fallbacks }
    }

    /// Pick a fallback model with the given RNG. The RNG is injected so tests
    /// can seed it; an empty fallback set yields the primary.
    pub fn choose_fallback_with<R: Rng>(&self, rng: &mut R) -> &str {
        if self.fallbacks.is_empty() {
            return &self.primary;
        }
        let idx = rng.random_range(0..self.fallbacks.len());
        &self.fallbacks[idx]
    }

    pub fn choose_fallback(&self) -> &str {
        self.choose_fallback_with(&mut rand::rng())
    }
}

/// Failure of a single upstream call.
#[derive(Debug, Clone)]
pub struct UpstreamError {
    pub status: String,
    pub message: String,
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status, self.message)
    }
}

impl std::error::Error for UpstreamError {}

/// Terminal failure of a completion request.
#[derive(Debug)]
pub enum CompletionError {
    /// Primary and fallback both failed; carries the fallback model actually
    /// attempted and the upstream status it failed with.
    Upstream { model: String, status: String },
}

impl fmt::Display for CompletionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upstream { model, status } => {
                write!(f, "fallback model {model} failed with status [{status}]")
            }
        }
    }
}

impl std::error::Error for CompletionError {}

/// A single chat-completion call against one model.
#[async_trait]
pub trait CompletionApi: Send + Sync {
    async fn complete_chat(
        &self,
        model: &str,
        entries: &[PromptEntry],
    ) -> Result<String, UpstreamError>;
}

/// OpenAI-style `/chat/completions` backend over HTTP.
pub struct HttpCompletionApi {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: &'a [PromptEntry],
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl HttpCompletionApi {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl CompletionApi for HttpCompletionApi {
    async fn complete_chat(
        &self,
        model: &str,
        entries: &[PromptEntry],
    ) -> Result<String, UpstreamError> {
        let request = ApiRequest {
            model,
            messages: entries,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| UpstreamError {
                status: "connection".to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError {
                status: status.to_string(),
                message: body,
            });
        }

        let parsed: ApiResponse = response.json().await.map_err(|e| UpstreamError {
            status: "parse".to_string(),
            message: e.to_string(),
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| UpstreamError {
                status: "empty".to_string(),
                message: "no choices in response".to_string(),
            })
    }
}

/// Completion backend wrapped with the persona preamble and the retry policy.
pub struct CompletionClient {
    api: Arc<dyn CompletionApi>,
    persona: String,
}

impl CompletionClient {
    /// The persona is passed in explicitly so tests can substitute it.
    pub fn new(api: Arc<dyn CompletionApi>, persona: String) -> Self {
        Self { api, persona }
    }

    /// Request a reply for a prompt. At most two upstream calls: the primary,
    /// then one uniformly-random fallback. A fallback failure is terminal.
    pub async fn request(
        &self,
        entries: &[PromptEntry],
        policy: &ModelPolicy,
    ) -> Result<String, CompletionError> {
        let fallback = policy.choose_fallback().to_string();
        self.request_with_fallback(entries, &policy.primary, &fallback)
            .await
    }

    /// Same as [`CompletionClient::request`] with the fallback choice already
    /// made, so callers can pin it.
    pub async fn request_with_fallback(
        &self,
        entries: &[PromptEntry],
        primary: &str,
        fallback: &str,
    ) -> Result<String, CompletionError> {
        let prompt = self.with_persona(entries);

        match self.api.complete_chat(primary, &prompt).await {
            Ok(text) => {
                info!("completed with model {primary}");
                Ok(normalize(&text))
            }
            Err(e) => {
                warn!("model {primary} failed with status [{}]", e.status);
                match self.api.complete_chat(fallback, &prompt).await {
                    Ok(text) => {
                        info!("completed with fallback model {fallback}");
                        Ok(normalize(&text))
                    }
                    Err(e) => Err(CompletionError::Upstream {
                        model: fallback.to_string(),
                        status: e.status,
                    }),
                }
            }
        }
    }

    fn with_persona(&self, entries: &[PromptEntry]) -> Vec<PromptEntry> {
        let mut prompt = Vec::with_capacity(entries.len() + 1);
        prompt.push(PromptEntry {
            role: Role::System,
            content: self.persona.clone(),
        });
        prompt.extend_from_slice(entries);
        prompt
    }
}

/// Undo accidental echoes of the structured input shape.
///
/// The backend sees user turns as single-element JSON arrays and sometimes
/// answers in that shape instead of free text. If the reply parses as a JSON
/// array whose first element has a string `message` field, only that field is
/// kept; anything else passes through unchanged. Runs on every successful
/// completion.
pub fn normalize(raw: &str) -> String {
    if let Ok(serde_json::Value::Array(items)) = serde_json::from_str::<serde_json::Value>(raw)
        && let Some(serde_json::Value::String(message)) =
            items.first().and_then(|item| item.get("message"))
    {
        return message.clone();
    }
    raw.to_string()
}
