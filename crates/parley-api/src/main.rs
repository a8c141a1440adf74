//! Parley entry point.
//!
//! Binary name: `parley`
//!
//! Parses CLI arguments, sets up tracing, loads configuration, then runs the
//! webhook server, the polling loop, or a one-shot command.

mod cli;
mod dispatch;
mod http;
mod poll;
mod state;

use clap::Parser;
use console::style;
use tracing::{info, warn};

use parley_infra::config::{load_config, require_bot_token};
use parley_infra::telegram::TelegramClient;
use parley_observe::tracing_setup::{TracingOptions, default_filter_for, init_tracing, shutdown_tracing};
use parley_types::config::BotConfig;

use cli::{Cli, Commands, WebhookCommand};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = TracingOptions {
        default_filter: default_filter_for(cli.verbose, cli.quiet).to_string(),
        json: cli.log_json,
        otel: cli.otel,
    };
    init_tracing(&options).map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config;
    match cli.command {
        // Rendering needs neither config nor credentials.
        Commands::Render { file, limit } => cli::render::run(file.as_deref(), limit).await,
        Commands::Serve { host, port } => {
            let config = load_config(config_path.as_deref()).await?;
            serve(&config, host, port).await
        }
        Commands::Poll => {
            let config = load_config(config_path.as_deref()).await?;
            let state = AppState::init(&config).await?;
            poll::run_polling(state, poll::POLL_TIMEOUT_SECS, shutdown_signal()).await
        }
        Commands::Webhook { action } => {
            let config = load_config(config_path.as_deref()).await?;
            manage_webhook(&config, action).await
        }
    }
}

async fn serve(config: &BotConfig, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let state = AppState::init(config).await?;
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    if state.webhook_secret.is_none() {
        warn!("no webhook secret configured; anyone who knows the URL can post updates");
    }
    info!(%addr, "webhook server listening");
    println!(
        "  {} Parley listening on {}",
        style("⚡").bold(),
        style(format!("http://{addr}{}", http::router::WEBHOOK_PATH)).cyan()
    );

    let router = http::router::build_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn manage_webhook(config: &BotConfig, action: WebhookCommand) -> anyhow::Result<()> {
    let token = require_bot_token(config)?.clone();
    let client = TelegramClient::new(token, &config.telegram.api_base)?;
    match action {
        WebhookCommand::Set { base_url } => {
            cli::webhook::set_webhook(&client, &base_url, config.telegram.webhook_secret.as_ref()).await
        }
        WebhookCommand::Delete => cli::webhook::delete_webhook(&client).await,
        WebhookCommand::Info => cli::webhook::webhook_info(&client).await,
    }
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_render_runs_without_loading_config() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("reply.md");
        std::fs::write(&input, "**Hello** <world>").unwrap();
        let missing_config = dir.path().join("absent.toml");

        let cli = Cli::parse_from([
            "parley".to_string(),
            "--config".to_string(),
            missing_config.display().to_string(),
            "render".to_string(),
            input.display().to_string(),
        ]);
        run(cli).await.unwrap();
    }
}
