//! Text generation capability and its Anthropic Messages implementation.
//!
//! Handlers only see [`TextGenerator`]; the production [`MessagesClient`] turns a
//! [`GenerationRequest`] into one `POST {api_base}/v1/messages` call over an [`HttpClient`].
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use crate::client::HttpClient;
use crate::settings::{ApiKey, Settings};

const MESSAGES_PATH: &str = "v1/messages";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// The body sent upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub model: String,
    pub max_tokens: u32,
    pub system: String,
    pub messages: Vec<Message>,
}

/// One block of the `content` array. Only text blocks are read.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentSegment {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Generation {
    #[serde(default)]
    pub content: Vec<ContentSegment>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl Generation {
    /// A generation holding a single text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentSegment::Text { text: text.into() }],
            ..Self::default()
        }
    }

    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|segment| match segment {
            ContentSegment::Text { text } => Some(text.as_str()),
            ContentSegment::Other => None,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The API answered with a non-success status.
    #[error("{status}: {message}")]
    Api { status: StatusCode, message: String },
    /// The API answered 2xx with a body we could not read.
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("failed to encode request: {0}")]
    Encode(String),
    /// The request never got an answer.
    #[error("transport failure: {0}")]
    Transport(String),
}

#[async_trait]
pub trait TextGenerator: std::fmt::Debug + Send + Sync {
    async fn generate(
        &self,
        api_key: &ApiKey,
        request: &GenerationRequest,
    ) -> Result<Generation, GenerationError>;
}

/// `{"type": "error", "error": {"type": ..., "message": ...}}`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(rename = "type")]
    kind: Option<String>,
    message: String,
}

fn describe_failure(body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope {
            error: ErrorDetail {
                kind: Some(kind),
                message,
            },
        }) => format!("{kind}: {message}"),
        Ok(envelope) => envelope.error.message,
        Err(_) => String::from_utf8_lossy(body).into_owned(),
    }
}

/// Talks to the Anthropic Messages API.
#[derive(Debug, Clone)]
pub struct MessagesClient<T: HttpClient> {
    http_client: T,
    endpoint: Url,
    api_version: String,
}

impl<T: HttpClient> MessagesClient<T> {
    pub fn new(http_client: T, api_base: &Url, api_version: impl Into<String>) -> anyhow::Result<Self> {
        // `join` replaces the last segment unless the base ends in a slash
        let mut base = api_base.clone();
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        let endpoint = base
            .join(MESSAGES_PATH)
            .map_err(|e| anyhow::anyhow!("Invalid API base {}: {}", api_base, e))?;
        Ok(Self {
            http_client,
            endpoint,
            api_version: api_version.into(),
        })
    }

    pub fn from_settings(http_client: T, settings: &Settings) -> anyhow::Result<Self> {
        Self::new(http_client, &settings.api_base, settings.api_version.clone())
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl<T: HttpClient + Send + Sync> TextGenerator for MessagesClient<T> {
    #[instrument(skip(self, api_key, request), fields(model = %request.model))]
    async fn generate(
        &self,
        api_key: &ApiKey,
        request: &GenerationRequest,
    ) -> Result<Generation, GenerationError> {
        let body = serde_json::to_vec(request).map_err(|e| GenerationError::Encode(e.to_string()))?;

        let req = Request::builder()
            .method("POST")
            .uri(self.endpoint.as_str())
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-api-key", api_key.expose())
            .header("anthropic-version", &self.api_version)
            .body(Body::from(body))
            .map_err(|e| GenerationError::Encode(e.to_string()))?;

        debug!("Sending generation request to {}", self.endpoint);
        let response = self
            .http_client
            .request(req)
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?
            .to_bytes();

        if !status.is_success() {
            return Err(GenerationError::Api {
                status,
                message: describe_failure(&bytes),
            });
        }

        let generation: Generation =
            serde_json::from_slice(&bytes).map_err(|e| GenerationError::Decode(e.to_string()))?;
        debug!(
            stop_reason = ?generation.stop_reason,
            output_tokens = generation.usage.as_ref().map(|u| u.output_tokens),
            "Generation finished"
        );
        Ok(generation)
    }
}
