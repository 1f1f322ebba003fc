//! Speech-to-text over the backend's transcription endpoint.

use std::fmt;

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::info;

/// Transcription failure. Terminal immediately: there is no retry policy.
#[derive(Debug)]
pub enum TranscriptionError {
    /// The audio payload was not valid base64.
    Decode(String),
    /// The upload request could not be built.
    Request(String),
    /// The transcription call failed; carries the upstream status.
    Upstream { status: String, message: String },
}

impl fmt::Display for TranscriptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(e) => write!(f, "invalid audio payload: {e}"),
            Self::Request(e) => write!(f, "failed to build transcription request: {e}"),
            Self::Upstream { status, message } => {
                write!(f, "audio transcription failed with status [{status}]: {message}")
            }
        }
    }
}

impl std::error::Error for TranscriptionError {}

/// Converts a base64 audio payload to plain transcript text in one call.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_b64: &str) -> Result<String, TranscriptionError>;
}

/// Whisper-style `/audio/transcriptions` endpoint over HTTP.
pub struct HttpTranscriber {
    base_url: String,
    api_key: String,
    model: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl HttpTranscriber {
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, audio_b64: &str) -> Result<String, TranscriptionError> {
        let audio = base64::engine::general_purpose::STANDARD
            .decode(audio_b64)
            .map_err(|e| TranscriptionError::Decode(e.to_string()))?;

        let part = Part::bytes(audio)
            .file_name("audio.ogg")
            .mime_str("audio/ogg")
            .map_err(|e| TranscriptionError::Request(e.to_string()))?;
        let form = Form::new().part("file", part).text("model", self.model.clone());

        let response = self
            .http
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TranscriptionError::Upstream {
                status: "connection".to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranscriptionError::Upstream {
                status: status.to_string(),
                message: body,
            });
        }

        let parsed: TranscriptionResponse =
            response.json().await.map_err(|e| TranscriptionError::Upstream {
                status: "parse".to_string(),
                message: e.to_string(),
            })?;

        info!("transcribed {} chars of audio", parsed.text.len());
        Ok(parsed.text)
    }
}
