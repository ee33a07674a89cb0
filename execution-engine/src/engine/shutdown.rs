use log::{error, info};
use std::sync::Arc;
use trading::{Exchange, ExchangeError};

/// Outcome of the cancel-all sweep.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    pub attempted: Vec<String>,
    pub failed: Vec<(String, ExchangeError)>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Cancels every open order on the tracked symbols when the process stops.
pub struct ShutdownHandler {
    exchange: Arc<dyn Exchange>,
    symbols: Vec<String>,
}

impl ShutdownHandler {
    pub fn new(exchange: Arc<dyn Exchange>, symbols: Vec<String>) -> Self {
        Self { exchange, symbols }
    }

    /// Attempts every symbol in order, one call at a time.
    pub async fn cancel_all(&self) -> ShutdownReport {
        info!("Stop bot.");
        let mut report = ShutdownReport::default();
        for symbol in &self.symbols {
            report.attempted.push(symbol.clone());
            match self.exchange.cancel_all_orders(symbol).await {
                Ok(()) => info!("Cancelled open orders of {}.", symbol),
                Err(e) => {
                    error!("Failed to cancel orders for {}: {}", symbol, e);
                    report.failed.push((symbol.clone(), e));
                }
            }
        }
        report
    }
}

/// Resolves on SIGINT or SIGTERM and returns the signal's name.
#[cfg(unix)]
pub async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    let name = tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res?;
            "SIGINT"
        }
        _ = terminate.recv() => "SIGTERM",
    };
    info!("Received {} signal.", name);
    Ok(name)
}

#[cfg(not(unix))]
pub async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    info!("Received SIGINT signal.");
    Ok("SIGINT")
}
