//! The config module holds the immutable records a pipeline run is parameterised by:
//! the prompt, the generation settings and the retry policy.

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use url::Url;

use crate::constants::{
    DEFAULT_FORMAT_RULES, DEFAULT_INSTRUCTIONS, DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
    DEFAULT_SOURCES, DEFAULT_TIMESTAMP_MARKER, DEFAULT_TRIGGER, GENERATION_ATTEMPTS,
    RATE_LIMIT_PAUSE_SECS, TIMESTAMP_FORMAT, TIMESTAMP_UTC_OFFSET_SECS,
};

/// Enum representing which text segments of a model response form the brief.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextPolicy {
    /// Only the first text segment.
    First,
    /// Only the last text segment, earlier ones are narration.
    Last,
    /// Drop the first text segment as preamble and join the rest.
    #[default]
    SkipPreamble,
    /// Join every text segment.
    All,
}

impl std::str::FromStr for TextPolicy {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.to_lowercase().as_str() {
            "first" => Ok(TextPolicy::First),
            "last" => Ok(TextPolicy::Last),
            "skip_preamble" => Ok(TextPolicy::SkipPreamble),
            "all" => Ok(TextPolicy::All),
            _ => Err(format!("Invalid text policy: {}", input)),
        }
    }
}

/// The prompt sent to the model on every run.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Role instructions, placed first in the system prompt
    pub instructions: String,
    /// Output-format rules, rendered as a bullet list
    pub format_rules: Vec<String>,
    /// Sources the model should search first, rendered as a bullet list
    pub sources: Vec<String>,
    /// User message template; `{timestamp}` is replaced with the run timestamp
    pub trigger: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            instructions: DEFAULT_INSTRUCTIONS.trim().to_owned(),
            format_rules: DEFAULT_FORMAT_RULES.iter().map(|s| s.to_string()).collect(),
            sources: DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect(),
            trigger: DEFAULT_TRIGGER.to_owned(),
        }
    }
}

impl PromptConfig {
    /// Renders instructions, source allow-list and format rules into one system prompt.
    pub fn system_prompt(&self) -> String {
        let mut prompt = self.instructions.trim().to_owned();

        if !self.sources.is_empty() {
            prompt.push_str("\n\n**SOURCE PRIORITY (search these first):**\n");
            prompt.push_str(&bullet_list(&self.sources));
        }

        if !self.format_rules.is_empty() {
            prompt.push_str("\n\n**FORMAT RULES:**\n");
            prompt.push_str(&bullet_list(&self.format_rules));
        }

        prompt
    }

    pub fn trigger_message(&self, timestamp: &str) -> String {
        self.trigger.replace("{timestamp}", timestamp)
    }
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {}", item.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Everything the brief generator needs besides credentials and the clock.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BriefConfig {
    /// Model identifier sent to the generation service
    pub model: String,
    /// Response token budget
    pub max_tokens: u32,
    /// Which text segments form the brief
    pub text_policy: TextPolicy,
    /// Drop lines starting with `timestamp_marker` from the brief
    pub drop_timestamp_lines: bool,
    pub timestamp_marker: String,
    /// Upper bound on web searches per request, service default when unset
    pub web_search_max_uses: Option<u32>,
    pub prompt: PromptConfig,
}

impl Default for BriefConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_owned(),
            max_tokens: DEFAULT_MAX_TOKENS,
            text_policy: TextPolicy::default(),
            drop_timestamp_lines: true,
            timestamp_marker: DEFAULT_TIMESTAMP_MARKER.to_owned(),
            web_search_max_uses: None,
            prompt: PromptConfig::default(),
        }
    }
}

impl BriefConfig {
    /// Loads a configuration from a TOML file. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML for this record.
    pub fn from_file(path: &str) -> Result<Self> {
        let content =
            fs::read_to_string(path).context(format!("Failed to read config file: {path}"))?;
        Self::from_toml_str(&content).context(format!("Invalid config file: {path}"))
    }

    /// Parses a configuration from TOML text. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for this record.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse config: {e}"))
    }
}

/// Bounded retry applied to rate-limited generation calls.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub attempts: u32,
    /// Fixed pause between attempts
    pub pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: GENERATION_ATTEMPTS,
            pause: Duration::from_secs(RATE_LIMIT_PAUSE_SECS),
        }
    }
}

/// Formats `now` as the Hong Kong wall-clock timestamp used in triggers and logs.
pub fn hkt_timestamp(now: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(TIMESTAMP_UTC_OFFSET_SECS) {
        Some(offset) => now.with_timezone(&offset).format(TIMESTAMP_FORMAT).to_string(),
        None => now.format(TIMESTAMP_FORMAT).to_string(),
    }
}

/// Appends `segments` to the path of `base`, keeping any path the base already has.
///
/// Each segment is pushed verbatim, so values such as bot tokens containing `:`
/// can never be read as a URL scheme.
///
/// # Errors
///
/// Returns an error if `base` cannot carry a path (e.g. a `mailto:` URL).
pub fn endpoint_url(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| anyhow::anyhow!("Invalid API base url: {base}"))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
