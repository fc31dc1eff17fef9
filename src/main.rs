//! briefcast is a CLI tool that asks a web-searching LLM for a pre-market brief
//! and delivers it to a Telegram chat.
//!
//! The tool has three commands:
//! 1. `run` - Generates a brief and delivers it
//! 2. `generate` - Generates a brief and prints it to stdout
//! 3. `send` - Delivers text from a file or stdin

use std::fs;
use std::io::Read;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use env_logger::Builder;
use log::{LevelFilter, info, warn};
use url::Url;

use briefcast::{
    BriefConfig, BriefOutcome, DispatchContext, Formatting, GenerateContext, RetryPolicy,
    TextPolicy,
    constants::{
        BOT_TOKEN_ENV_NAME, CHAT_ID_ENV_NAME, DEFAULT_BOT_API_BASE, DEFAULT_MODEL_API_BASE,
        MODEL_API_KEY_ENV_NAME,
    },
    deliver::TelegramSender,
    dispatch, generate_brief, hkt_timestamp,
    model::AnthropicModel,
};

/// A CLI tool to generate a market brief and deliver it to Telegram
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The command to execute (run, generate or send)
    #[command(subcommand)]
    command: Command,

    #[arg(long, short, action = clap::ArgAction::Count, help = "Output v(v...)erbosity: error (0), warn (1), info (2), debug (3), trace (4)", global = true, default_value_t = 2)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a brief and deliver it to the chat
    Run {
        #[command(flatten)]
        generate: GenerateArgs,
        #[command(flatten)]
        deliver: DeliverArgs,
    },
    /// Generate a brief and print it to stdout
    Generate {
        #[command(flatten)]
        generate: GenerateArgs,
    },
    /// Deliver text from a file (or stdin) to the chat
    Send {
        /// Path to the file to send, stdin when omitted
        file: Option<String>,
        #[command(flatten)]
        deliver: DeliverArgs,
    },
}

#[derive(Args)]
struct GenerateArgs {
    /// API key of the generation service
    #[arg(long, env = MODEL_API_KEY_ENV_NAME, hide_env_values = true)]
    api_key: String,
    /// Path to a TOML file with the brief configuration
    #[arg(long, short)]
    config: Option<String>,
    /// Model identifier (overrides the configuration)
    #[arg(long, short)]
    model: Option<String>,
    /// Response token budget (overrides the configuration)
    #[arg(long)]
    max_tokens: Option<u32>,
    /// Text segments forming the brief: "first", "last", "skip_preamble" or "all"
    #[arg(long, short = 't')]
    text_policy: Option<TextPolicy>,
    /// Base URL of the generation service
    #[arg(long, default_value = DEFAULT_MODEL_API_BASE)]
    api_base: String,
    /// Generation request timeout in seconds
    #[arg(long, default_value_t = 600)]
    timeout: u64,
}

#[derive(Args)]
struct DeliverArgs {
    /// Telegram bot token
    #[arg(long, env = BOT_TOKEN_ENV_NAME, hide_env_values = true)]
    bot_token: String,
    /// Destination chat identifier
    #[arg(long, env = CHAT_ID_ENV_NAME)]
    chat_id: String,
    /// Send plain text instead of Markdown
    #[arg(long)]
    plain: bool,
    /// Base URL of the bot API
    #[arg(long, default_value = DEFAULT_BOT_API_BASE)]
    bot_api_base: String,
    /// Delivery request timeout in seconds
    #[arg(long, default_value_t = 30)]
    send_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    Builder::new()
        .filter_level(match cli.verbose {
            0 => LevelFilter::Error,
            1 => LevelFilter::Warn,
            2 => LevelFilter::Info,
            3 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        })
        .init();

    let timestamp = hkt_timestamp(Utc::now());

    match cli.command {
        Command::Run { generate, deliver } => {
            let brief = handle_generate_command(&generate, &timestamp).await?;
            handle_deliver_command(&deliver, &brief).await?;
            println!("Sent at {timestamp}");
        }
        Command::Generate { generate } => {
            let brief = handle_generate_command(&generate, &timestamp).await?;
            println!("{brief}");
        }
        Command::Send { file, deliver } => {
            let text = match file {
                Some(file) => {
                    fs::read_to_string(&file).context(format!("Failed to read file: {file}"))?
                }
                None => {
                    let mut text = String::new();
                    std::io::stdin()
                        .read_to_string(&mut text)
                        .context("Failed to read stdin")?;
                    text
                }
            };
            handle_deliver_command(&deliver, &text).await?;
            println!("Sent at {timestamp}");
        }
    }

    Ok(())
}

async fn handle_generate_command(args: &GenerateArgs, timestamp: &str) -> Result<String> {
    let mut config = match &args.config {
        Some(file) => BriefConfig::from_file(file)?,
        None => BriefConfig::default(),
    };
    if let Some(model) = &args.model {
        config.model = model.clone();
    }
    if let Some(max_tokens) = args.max_tokens {
        config.max_tokens = max_tokens;
    }
    if let Some(text_policy) = args.text_policy {
        config.text_policy = text_policy;
    }

    let api_base =
        Url::parse(&args.api_base).map_err(|e| anyhow::anyhow!("Invalid model API url: {}", e))?;
    let model = AnthropicModel::new(
        &api_base,
        args.api_key.clone(),
        Duration::from_secs(args.timeout),
    )?;

    let ctx = GenerateContext {
        model: &model,
        config: &config,
        retry: RetryPolicy::default(),
    };

    let outcome = generate_brief(&ctx, timestamp).await?;
    match &outcome {
        BriefOutcome::Brief(text) => info!("Generated brief of {} characters", text.chars().count()),
        BriefOutcome::RateLimited => warn!("Giving up on generation after repeated rate limits"),
        BriefOutcome::Empty => warn!("Model returned no text"),
    }

    Ok(outcome.into_message())
}

async fn handle_deliver_command(args: &DeliverArgs, text: &str) -> Result<()> {
    let api_base = Url::parse(&args.bot_api_base)
        .map_err(|e| anyhow::anyhow!("Invalid bot API url: {}", e))?;
    let sender = TelegramSender::new(
        &api_base,
        &args.bot_token,
        Duration::from_secs(args.send_timeout),
    )?;

    let ctx = DispatchContext {
        sender: &sender,
        chat_id: &args.chat_id,
        formatting: if args.plain {
            Formatting::Plain
        } else {
            Formatting::RichText
        },
    };

    let report = dispatch(&ctx, text).await;
    if report.dropped > 0 {
        warn!(
            "Delivered {} of {} chunks, {} dropped",
            report.delivered,
            report.total(),
            report.dropped
        );
    } else {
        info!("Delivered {} chunks", report.delivered);
    }

    Ok(())
}
