//! launchwatch-bot entry point
//!
//! Wires the components together and supervises the scan loop:
//! config → chain client + notifier → scanner, with SIGINT/SIGTERM fanned
//! out through a watch channel for graceful shutdown. Exit code 0 on
//! graceful shutdown; a fatal configuration error propagates as `Err` and
//! the process exits non-zero for the supervisor to see.

use anyhow::Result;
use clap::Parser;
use futures::StreamExt;
use launchwatch_bot::chain::PumpFunClient;
use launchwatch_bot::config::load_config;
use launchwatch_bot::notify::{NotifyService, TelegramNotifier};
use launchwatch_bot::retry::RetryPolicy;
use launchwatch_bot::scanner::Scanner;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook_tokio::Signals;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Early Token Launch Scanner - Pump.fun polling with Telegram alerts
#[derive(Parser)]
#[command(name = "launchwatch-bot")]
struct Args {
    /// Optional TOML file with scanner timing and filter thresholds
    #[arg(short, long, env = "LAUNCHWATCH_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // Fatal configuration errors (missing credential, bad URL) abort here
    // with a non-zero exit - the one condition that is never retried.
    let config = load_config(args.config.as_deref())?;

    info!("Launch Scanner starting");
    info!("Scan interval: {:?}", config.scan_interval);
    info!("Heartbeat interval: {:?}", config.heartbeat_interval);
    info!("Seen-set expiry: {:?}", config.seen_expiry);
    info!(
        "Filter: min {} SOL, age {}..{}s",
        config.filter.min_liquidity_sol, config.filter.min_age_secs, config.filter.max_age_secs
    );
    match &config.api_base_url {
        Some(url) => info!("Launchpad API: {}", url),
        None => info!("Launchpad API: default (Pump.fun frontend)"),
    }

    let retry = RetryPolicy::new(config.retry_max_attempts, config.retry_base_delay);

    let client = Arc::new(PumpFunClient::new(
        config.api_base_url.as_deref(),
        config.page_limit,
        config.request_timeout,
        retry.clone(),
    ));

    let notifier = Arc::new(TelegramNotifier::new(
        &config.telegram_bot_token,
        &config.telegram_chat_id,
        config.request_timeout,
    ));
    let notify = NotifyService::spawn(notifier, retry, 64);

    // Shutdown signal fan-out
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    let signals_handle = signals.handle();
    tokio::spawn(async move {
        if let Some(signal) = signals.next().await {
            info!(signal, "shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    let scanner = Scanner::new(client, notify, config);
    scanner.run(shutdown_rx).await?;

    signals_handle.close();
    info!("graceful shutdown complete");
    Ok(())
}
