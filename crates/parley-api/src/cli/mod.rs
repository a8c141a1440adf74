//! CLI command definitions for the `parley` binary.

pub mod render;
pub mod webhook;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use parley_core::delivery::TELEGRAM_MESSAGE_LIMIT;

/// Telegram chat bot backed by an OpenAI-compatible model.
#[derive(Parser)]
#[command(name = "parley", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Optional TOML config file; environment variables override it.
    #[arg(long, global = true, env = "PARLEY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Only log errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// More logging (-v for debug, -vv for trace). `RUST_LOG` wins when set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log one JSON object per event.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the Telegram webhook over HTTP.
    Serve {
        /// Bind address (defaults to `server.host`).
        #[arg(long)]
        host: Option<String>,

        /// Port (defaults to `server.port` or `PORT`).
        #[arg(long)]
        port: Option<u16>,
    },

    /// Fetch updates with long polling instead of a webhook.
    Poll,

    /// Manage the webhook registered with Telegram.
    Webhook {
        #[command(subcommand)]
        action: WebhookCommand,
    },

    /// Render markdown from a file or stdin and print the resulting chunks.
    Render {
        /// Input file; reads stdin when omitted.
        file: Option<PathBuf>,

        /// Chunk size in UTF-16 code units.
        #[arg(long, default_value_t = TELEGRAM_MESSAGE_LIMIT)]
        limit: usize,
    },
}

#[derive(Subcommand)]
pub enum WebhookCommand {
    /// Register `<base-url>/api/webhook` with Telegram.
    Set {
        /// Public base URL of the server, e.g. https://bot.example.com
        base_url: String,
    },

    /// Remove the webhook (required before `parley poll`).
    Delete,

    /// Show Telegram's view of the current webhook.
    Info,
}
