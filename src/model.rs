//! The model module talks to the text-generation service. A request carries the
//! system prompt, a single trigger message and the web-search tool; a response is
//! decoded into the ordered list of content segments the service returned.

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::config::endpoint_url;
use crate::constants::{MODEL_API_VERSION, WEB_SEARCH_TOOL_NAME, WEB_SEARCH_TOOL_TYPE};

/// One content segment of a generation response, in service order.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Segment {
    /// Natural-language output.
    Text { text: String },
    /// Tool invocations, tool results and anything else that is not text.
    #[serde(other)]
    Other,
}

impl Segment {
    pub fn text(text: impl Into<String>) -> Self {
        Segment::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Segment::Text { text } => Some(text),
            Segment::Other => None,
        }
    }
}

/// A single generation call.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct GenerationRequest {
    pub model: String,
    pub system: String,
    pub trigger: String,
    pub max_tokens: u32,
    pub web_search_max_uses: Option<u32>,
}

/// Errors returned by a generation service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// The service asked us to slow down.
    #[error("rate limited: {0}")]
    RateLimited(String),
    /// The service answered with any other non-success status.
    #[error("generation service error ({status}): {message}")]
    Api { status: u16, message: String },
    /// The request did not complete.
    #[error("transport error: {0}")]
    Transport(String),
    /// The response body could not be decoded.
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// A text-generation service with a web-search tool.
#[async_trait]
pub trait BriefModel: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<Segment>, ModelError>;
}

/// JSON body of a messages request.
#[derive(Serialize)]
pub struct MessagesBody<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [UserMessage<'a>; 1],
    tools: [WebSearchTool; 1],
}

#[derive(Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct WebSearchTool {
    #[serde(rename = "type")]
    kind: &'static str,
    name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_uses: Option<u32>,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<Segment>,
    #[serde(default)]
    stop_reason: Option<String>,
}

/// Builds the body of a messages request.
pub fn request_body(request: &GenerationRequest) -> MessagesBody<'_> {
    MessagesBody {
        model: &request.model,
        max_tokens: request.max_tokens,
        system: &request.system,
        messages: [UserMessage {
            role: "user",
            content: &request.trigger,
        }],
        tools: [WebSearchTool {
            kind: WEB_SEARCH_TOOL_TYPE,
            name: WEB_SEARCH_TOOL_NAME,
            max_uses: request.web_search_max_uses,
        }],
    }
}

/// Decodes a messages response body into its content segments.
///
/// # Errors
///
/// Returns `ModelError::Decode` if the body is not a messages response.
pub fn decode_segments(body: &str) -> Result<Vec<Segment>, ModelError> {
    let response: MessagesResponse =
        serde_json::from_str(body).map_err(|e| ModelError::Decode(e.to_string()))?;
    if let Some(reason) = &response.stop_reason {
        debug!("Generation stopped: {reason}");
        if reason == "max_tokens" {
            warn!("Brief was cut off by the token budget");
        }
    }
    Ok(response.content)
}

/// Maps a non-success status to an error, rate limiting kept apart.
pub fn status_error(status: StatusCode, body: String) -> ModelError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        ModelError::RateLimited(body)
    } else {
        ModelError::Api {
            status: status.as_u16(),
            message: body,
        }
    }
}

/// Messages API client.
pub struct AnthropicModel {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

impl AnthropicModel {
    /// Creates a client for the messages endpoint under `api_base`.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL cannot be built or the HTTP client fails to initialize.
    pub fn new(api_base: &Url, api_key: String, timeout: Duration) -> anyhow::Result<Self> {
        let endpoint = endpoint_url(api_base, &["v1", "messages"])?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl BriefModel for AnthropicModel {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<Segment>, ModelError> {
        debug!("Requesting {} from {}", request.model, self.endpoint);
        let response = self
            .client
            .post(self.endpoint.clone())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", MODEL_API_VERSION)
            .json(&request_body(request))
            .send()
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(status_error(status, body));
        }

        decode_segments(&body)
    }
}
