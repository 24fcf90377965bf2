//! # tgrelay
//!
//! Binary entry point for the relay.
//!
//! This crate provides:
//! - CLI argument parsing using `clap`
//! - Logging setup and configuration loading
//! - `tgrelay` — poll Telegram and forward updates until Ctrl+C / SIGTERM
//! - `tgrelay --web-hook` — register the configured webhook and exit

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tgrelay_core::{HttpSink, RelayConfig, RelayLoop, TelegramApi};
use tracing::info;

/// tgrelay - forwards Telegram bot updates to a downstream HTTP endpoint
#[derive(Parser, Debug)]
#[command(name = "tgrelay", version, about)]
struct Cli {
    /// Path to configuration file (default: ./tgrelay.yml if present)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Register the configured webhook with Telegram and exit
    #[arg(long = "web-hook")]
    web_hook: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose when set
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config =
        RelayConfig::load(cli.config.as_deref()).context("Invalid relay configuration")?;

    if cli.web_hook {
        register_webhook(&config).await
    } else {
        run_relay(&config).await
    }
}

async fn register_webhook(config: &RelayConfig) -> Result<()> {
    let url = config.webhook_url()?;
    let api = TelegramApi::new(&config.telegram).context("Failed to build Telegram client")?;

    api.register_webhook(url)
        .await
        .context("Failed to register webhook")?;
    Ok(())
}

async fn run_relay(config: &RelayConfig) -> Result<()> {
    let api = TelegramApi::new(&config.telegram).context("Failed to build Telegram client")?;
    let sink = HttpSink::new(&config.sink).context("Failed to build sink client")?;

    info!(
        bot_token = %api.bot_token_masked(),
        sink = %sink.url(),
        poll_interval_ms = config.relay.poll_interval_ms,
        "Relay has started"
    );

    let handle = RelayLoop::new(Arc::new(api), Arc::new(sink), &config.relay).spawn();

    wait_for_shutdown().await?;
    info!("Shutdown requested, finishing current cycle");
    handle.stop();

    let cursor = handle.join().await.context("Relay task failed")?;
    info!(cursor = %cursor, "Relay stopped");
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to register SIGTERM handler")?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.context("Failed to listen for Ctrl+C")?,
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    Ok(())
}
