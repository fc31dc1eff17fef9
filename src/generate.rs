//! The generate module asks the model for a brief and turns its mixed response
//! into the text that gets delivered.

use anyhow::Result;
use log::{debug, info, warn};

use crate::config::{BriefConfig, RetryPolicy, TextPolicy};
use crate::constants::{NO_TEXT_SENTINEL, RATE_LIMITED_SENTINEL};
use crate::model::{BriefModel, GenerationRequest, ModelError, Segment};

/// Result of one generation run.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum BriefOutcome {
    /// The cleaned brief text.
    Brief(String),
    /// Every attempt was rate limited.
    RateLimited,
    /// The response held no usable text.
    Empty,
}

impl BriefOutcome {
    /// Text to deliver: the brief itself or a sentinel describing the failure.
    pub fn into_message(self) -> String {
        match self {
            BriefOutcome::Brief(text) => text,
            BriefOutcome::RateLimited => RATE_LIMITED_SENTINEL.to_owned(),
            BriefOutcome::Empty => NO_TEXT_SENTINEL.to_owned(),
        }
    }
}

/// Shared data for a generation run
pub struct GenerateContext<'a> {
    /// Generation service to query
    pub model: &'a dyn BriefModel,
    pub config: &'a BriefConfig,
    pub retry: RetryPolicy,
}

/// Generates a brief for the run identified by `timestamp`.
///
/// Rate-limited calls are retried after a fixed pause until the retry policy is
/// exhausted, which yields `BriefOutcome::RateLimited` instead of an error.
///
/// # Arguments
///
/// * `ctx` - Model, configuration and retry policy
/// * `timestamp` - Run timestamp substituted into the trigger message
///
/// # Errors
///
/// Returns an error for any generation failure other than rate limiting.
pub async fn generate_brief(ctx: &GenerateContext<'_>, timestamp: &str) -> Result<BriefOutcome> {
    let request = GenerationRequest {
        model: ctx.config.model.clone(),
        system: ctx.config.prompt.system_prompt(),
        trigger: ctx.config.prompt.trigger_message(timestamp),
        max_tokens: ctx.config.max_tokens,
        web_search_max_uses: ctx.config.web_search_max_uses,
    };

    let attempts = ctx.retry.attempts.max(1);
    let mut attempt = 1;
    let segments = loop {
        info!("Generating brief with {} (attempt {attempt}/{attempts})", request.model);
        match ctx.model.generate(&request).await {
            Ok(segments) => break segments,
            Err(ModelError::RateLimited(message)) => {
                warn!("Rate limited on attempt {attempt}/{attempts}: {message}");
                if attempt >= attempts {
                    return Ok(BriefOutcome::RateLimited);
                }
                attempt += 1;
                tokio::time::sleep(ctx.retry.pause).await;
            }
            Err(err) => return Err(anyhow::anyhow!("Brief generation failed: {err}")),
        }
    };

    debug!("Received {} segments", segments.len());

    Ok(
        match extract_text(&segments, ctx.config.text_policy, &line_filter(ctx.config)) {
            Some(brief) => BriefOutcome::Brief(brief),
            None => BriefOutcome::Empty,
        },
    )
}

fn line_filter(config: &BriefConfig) -> LineFilter<'_> {
    LineFilter {
        timestamp_marker: config
            .drop_timestamp_lines
            .then_some(config.timestamp_marker.as_str())
            .filter(|marker| !marker.is_empty()),
    }
}

/// Post-processing applied to every selected text segment.
#[derive(Clone, Copy, Debug, Default)]
pub struct LineFilter<'a> {
    /// Lines starting with this marker are dropped
    pub timestamp_marker: Option<&'a str>,
}

/// Selects text segments according to `policy` and joins the cleaned ones with a blank line.
///
/// Returns `None` when nothing is left, e.g. a lone preamble under `TextPolicy::SkipPreamble`.
pub fn extract_text(segments: &[Segment], policy: TextPolicy, filter: &LineFilter) -> Option<String> {
    let texts: Vec<&str> = segments.iter().filter_map(Segment::as_text).collect();

    let selected: Vec<&str> = match policy {
        TextPolicy::First => texts.first().copied().into_iter().collect(),
        TextPolicy::Last => texts.last().copied().into_iter().collect(),
        TextPolicy::SkipPreamble => texts.iter().skip(1).copied().collect(),
        TextPolicy::All => texts,
    };

    let cleaned: Vec<String> = selected
        .into_iter()
        .map(|text| clean_text(text, filter))
        .filter(|text| !text.is_empty())
        .collect();

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.join("\n\n"))
    }
}

/// Trims every line and drops blank lines, plus timestamp lines when the filter asks for it.
pub fn clean_text(text: &str, filter: &LineFilter) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| {
            filter
                .timestamp_marker
                .is_none_or(|marker| !line.starts_with(marker))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
