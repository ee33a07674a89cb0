use anyhow::{Context, Result};
use broker_gateway::{BybitClient, Credentials, LogNotifier, Network, SlackNotifier};
use clap::Parser;
use execution_engine::engine::{wait_for_signal, Scheduler, ShutdownHandler};
use execution_engine::io::Args;
use execution_engine::models::{slack_webhook_url, BotConfig, ExchangeSettings, SymbolCatalog};
use log::{error, info, warn};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use trading::{Exchange, Notifier};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    // Resolved before anything else so startup failures still get reported.
    let notifier: Arc<dyn Notifier> = match slack_webhook_url(|name| std::env::var(name).ok()) {
        Some(url) => Arc::new(SlackNotifier::new(url)),
        None => Arc::new(LogNotifier),
    };

    if let Err(e) = run(args, Arc::clone(&notifier)).await {
        error!("{:#}", e);
        let text = format!("An error has occurred.\n```{:#}```", e);
        if let Err(e) = notifier.notify(&text).await {
            warn!("Failed to send notification: {}", e);
        }
        std::process::exit(1);
    }
}

async fn run(args: Args, notifier: Arc<dyn Notifier>) -> Result<()> {
    let config = BotConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let settings = ExchangeSettings::from_env(args.testnet)?;
    let network = if settings.is_testnet() {
        Network::Testnet
    } else {
        Network::Mainnet
    };

    let credentials = Credentials::new(settings.api_key(), settings.api_secret());
    let exchange: Arc<dyn Exchange> = Arc::new(BybitClient::new(
        credentials,
        network,
        config.request_timeout(),
    )?);

    let catalog = SymbolCatalog::load(exchange.as_ref()).await?;
    let scheduler = Scheduler::new(
        Arc::clone(&exchange),
        Arc::clone(&notifier),
        &catalog,
        config.symbols(),
    )?
    .with_window(config.window())
    .with_thresholds(config.thresholds())
    .with_timing(config.driver_timing())
    .with_check_interval(config.window_check_interval());
    let shutdown = ShutdownHandler::new(Arc::clone(&exchange), scheduler.symbols());

    let started = format!("Run bybit-frbot in {}.", network);
    info!("{}", started);
    if let Err(e) = notifier.notify(&started).await {
        warn!("Failed to send notification: {}", e);
    }

    let cancel = CancellationToken::new();
    tokio::select! {
        _ = scheduler.run(cancel.clone()) => {
            info!("Scheduler exited.");
        }
        signal = wait_for_signal() => {
            signal.context("installing signal handlers")?;
            cancel.cancel();
            let report = shutdown.cancel_all().await;
            if !report.is_clean() {
                warn!(
                    "Cancel-all failed for {} of {} symbols.",
                    report.failed.len(),
                    report.attempted.len()
                );
            }
        }
    }
    Ok(())
}
