//! The deliver module splits a brief into message-sized chunks and posts them to
//! a chat through the bot API, one request per chunk.

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info, warn};
use serde::Serialize;
use std::time::Duration;
use url::Url;

use crate::config::endpoint_url;
use crate::constants::{CHUNK_SIZE, RICH_TEXT_PARSE_MODE};

/// Enum representing how the chat renders a message.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Formatting {
    /// Markdown rendering, with a plain-text fallback on rejection
    #[default]
    RichText,
    Plain,
}

impl Formatting {
    pub fn parse_mode(self) -> Option<&'static str> {
        match self {
            Formatting::RichText => Some(RICH_TEXT_PARSE_MODE),
            Formatting::Plain => None,
        }
    }
}

/// Errors returned by a message sender.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The endpoint answered with a non-success status.
    #[error("message rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    /// The request did not complete.
    #[error("transport error: {0}")]
    Transport(String),
}

/// A chat endpoint that accepts one message per call.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        formatting: Formatting,
    ) -> Result<(), DeliveryError>;
}

#[derive(Serialize)]
struct SendMessageBody<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
}

/// Telegram bot API sender.
pub struct TelegramSender {
    client: reqwest::Client,
    endpoint: Url,
}

impl TelegramSender {
    /// Creates a sender for the bot identified by `token` under `api_base`.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL cannot be built or the HTTP client fails to initialize.
    pub fn new(api_base: &Url, token: &str, timeout: Duration) -> Result<Self> {
        let bot = format!("bot{token}");
        let endpoint = endpoint_url(api_base, &[bot.as_str(), "sendMessage"])?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    /// Full `sendMessage` URL, bot token included.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl MessageSender for TelegramSender {
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        formatting: Formatting,
    ) -> Result<(), DeliveryError> {
        let body = SendMessageBody {
            chat_id,
            text,
            parse_mode: formatting.parse_mode(),
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        Err(DeliveryError::Rejected {
            status: status.as_u16(),
            message: response.text().await.unwrap_or_default(),
        })
    }
}

/// Splits `text` into consecutive slices of at most `size` characters.
///
/// Slicing is positional and may cut through a word or a markup token.
/// A `size` of zero is treated as one.
pub fn chunk_text(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;

    for ch in text.chars() {
        current.push(ch);
        count += 1;
        if count == size {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Outcome of a dispatch, counted per chunk.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct DeliveryReport {
    /// Chunks accepted by the endpoint, fallbacks included
    pub delivered: usize,
    /// Chunks given up on
    pub dropped: usize,
}

impl DeliveryReport {
    pub fn total(self) -> usize {
        self.delivered + self.dropped
    }
}

/// Shared data for a dispatch
pub struct DispatchContext<'a> {
    pub sender: &'a dyn MessageSender,
    /// Destination chat identifier
    pub chat_id: &'a str,
    pub formatting: Formatting,
}

/// Sends `text` in chunks of `CHUNK_SIZE` characters, in order.
///
/// A rich-text chunk rejected by the endpoint is resent once as plain text.
/// Chunks that still fail are dropped and the remaining chunks are sent anyway.
pub async fn dispatch(ctx: &DispatchContext<'_>, text: &str) -> DeliveryReport {
    let chunks = chunk_text(text, CHUNK_SIZE);
    let total = chunks.len();
    let mut report = DeliveryReport::default();

    info!("Delivering {} characters in {total} chunks", text.chars().count());

    for (index, chunk) in chunks.iter().enumerate() {
        let number = index + 1;
        if send_chunk(ctx, chunk).await {
            debug!("Delivered chunk {number}/{total}");
            report.delivered += 1;
        } else {
            warn!("Dropped chunk {number}/{total}");
            report.dropped += 1;
        }
    }

    report
}

async fn send_chunk(ctx: &DispatchContext<'_>, chunk: &str) -> bool {
    match ctx
        .sender
        .send_message(ctx.chat_id, chunk, ctx.formatting)
        .await
    {
        Ok(()) => true,
        Err(err @ DeliveryError::Rejected { .. }) if ctx.formatting == Formatting::RichText => {
            warn!("{err}, retrying as plain text");
            match ctx
                .sender
                .send_message(ctx.chat_id, chunk, Formatting::Plain)
                .await
            {
                Ok(()) => true,
                Err(err) => {
                    warn!("Plain text fallback failed: {err}");
                    false
                }
            }
        }
        Err(err) => {
            warn!("{err}");
            false
        }
    }
}
