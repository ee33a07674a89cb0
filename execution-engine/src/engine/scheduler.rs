use super::driver::{CycleOutcome, DriverTiming, Leg, OrderDriver};
use super::summary::build_summary;
use super::window::FundingWindow;
use super::send_notification;
use crate::error::{EngineError, Result};
use crate::models::SymbolCatalog;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use trading::{Exchange, FundingRate, Notifier, SymbolInfo};

/// Funding-rate levels that decide whether to hold a short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FundingThresholds {
    entry: Decimal,
    exit: Decimal,
}

impl Default for FundingThresholds {
    fn default() -> Self {
        Self::new(Decimal::ZERO, Decimal::ZERO)
    }
}

impl FundingThresholds {
    pub fn new(entry: Decimal, exit: Decimal) -> Self {
        Self { entry, exit }
    }

    /// Open (or add to) the short when the rate is at least this.
    pub fn entry(&self) -> Decimal {
        self.entry
    }

    /// Close an open short when the rate is below this.
    pub fn exit(&self) -> Decimal {
        self.exit
    }
}

/// Result of maintaining one symbol in one window.
#[derive(Debug, Clone, PartialEq)]
pub struct MaintenanceReport {
    pub symbol: String,
    pub funding: FundingRate,
    pub position_size: Decimal,
    pub close: Option<CycleOutcome>,
    pub open: Option<CycleOutcome>,
}

/// Result of one funding window.
#[derive(Debug)]
pub struct WindowReport {
    pub started_at: DateTime<Utc>,
    pub maintained: Vec<MaintenanceReport>,
    /// Symbols whose maintenance failed, with the reason.
    pub failed: Vec<(String, String)>,
}

/// Watches the clock and maintains every tracked symbol once per funding
/// window.
pub struct Scheduler {
    exchange: Arc<dyn Exchange>,
    notifier: Arc<dyn Notifier>,
    tracked: Vec<Arc<SymbolInfo>>,
    thresholds: FundingThresholds,
    window: FundingWindow,
    timing: DriverTiming,
    check_interval: Duration,
    last_run: Option<DateTime<Utc>>,
}

impl Scheduler {
    pub fn new(
        exchange: Arc<dyn Exchange>,
        notifier: Arc<dyn Notifier>,
        catalog: &SymbolCatalog,
        tracked: &[String],
    ) -> Result<Self> {
        if tracked.is_empty() {
            return Err(EngineError::NoSymbols);
        }
        let mut seen = BTreeSet::new();
        if let Some(name) = tracked.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(EngineError::DuplicateSymbol(name.clone()));
        }
        let tracked = tracked
            .iter()
            .map(|name| catalog.require(name).map(|info| Arc::new(info.clone())))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            exchange,
            notifier,
            tracked,
            thresholds: FundingThresholds::default(),
            window: FundingWindow::default(),
            timing: DriverTiming::default(),
            check_interval: Duration::from_secs(5),
            last_run: None,
        })
    }

    pub fn with_thresholds(mut self, thresholds: FundingThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_window(mut self, window: FundingWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_timing(mut self, timing: DriverTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    pub fn symbols(&self) -> Vec<String> {
        self.tracked.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        self.last_run
    }

    /// Runs until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            "Scheduler started: symbols={:?}, hours={:?}, start_minute={}",
            self.symbols(),
            self.window.hours(),
            self.window.start_minute()
        );
        while !cancel.is_cancelled() {
            if let Some(report) = self.tick(Utc::now(), &cancel).await {
                info!(
                    "Window {} done: maintained={}, failed={}",
                    report.started_at,
                    report.maintained.len(),
                    report.failed.len()
                );
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.check_interval) => {}
            }
        }
        info!("Scheduler stopped.");
    }

    /// Maintains all symbols if `now` enters a window not yet handled.
    pub async fn tick(
        &mut self,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Option<WindowReport> {
        if !self.window.should_trigger(now, self.last_run) {
            return None;
        }
        info!("Start maintaining positions. now={}", now);

        let mut tasks = JoinSet::new();
        for symbol in &self.tracked {
            let exchange = Arc::clone(&self.exchange);
            let notifier = Arc::clone(&self.notifier);
            let symbol = Arc::clone(symbol);
            let thresholds = self.thresholds;
            let timing = self.timing;
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let name = symbol.name().to_string();
                let result = maintain_position(
                    exchange.as_ref(),
                    notifier.as_ref(),
                    &symbol,
                    thresholds,
                    timing,
                    cancel,
                )
                .await;
                (name, result)
            });
        }

        let mut pending: BTreeSet<String> = self.symbols().into_iter().collect();
        let mut maintained = Vec::new();
        let mut failed = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((symbol, Ok(report))) => {
                    pending.remove(&symbol);
                    maintained.push(report);
                }
                Ok((symbol, Err(e))) => {
                    error!("Failed to maintain position of {}: {}", symbol, e);
                    pending.remove(&symbol);
                    failed.push((symbol, e.to_string()));
                }
                Err(e) => error!("Maintenance task panicked: {}", e),
            }
        }
        // Whatever is still pending belongs to a task that panicked.
        failed.extend(pending.into_iter().map(|s| (s, "task panicked".to_string())));
        maintained.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        self.last_run = Some(now);
        info!("Finished maintaining positions.");

        if cancel.is_cancelled() {
            info!("Skip maintenance summary after stop.");
        } else {
            match build_summary(self.exchange.as_ref(), &self.symbols(), Utc::now()).await {
                Ok(text) => send_notification(self.notifier.as_ref(), &text).await,
                Err(e) => error!("Failed to build maintenance summary: {}", e),
            }
        }

        Some(WindowReport {
            started_at: now,
            maintained,
            failed,
        })
    }
}

/// Closes or opens the short on one symbol depending on its last funding rate.
pub async fn maintain_position(
    exchange: &dyn Exchange,
    notifier: &dyn Notifier,
    symbol: &SymbolInfo,
    thresholds: FundingThresholds,
    timing: DriverTiming,
    cancel: CancellationToken,
) -> Result<MaintenanceReport> {
    let name = symbol.name();
    let funding = exchange.previous_funding(name).await?;
    info!("Previous funding rate of {}: {}", name, funding.rate);
    let position = exchange.position(name).await?;
    info!("Position of {}: side={:?}, size={}", name, position.side, position.size);

    let driver = OrderDriver::new(exchange, notifier, symbol, timing, cancel);
    let mut report = MaintenanceReport {
        symbol: name.to_string(),
        funding,
        position_size: position.size,
        close: None,
        open: None,
    };

    if position.is_open() && report.funding.rate < thresholds.exit() {
        let quantity = position.size.trunc().to_u64().unwrap_or(0);
        report.close = Some(driver.run(Leg::Close { quantity }).await?);
    }
    if report.funding.rate >= thresholds.entry() {
        if matches!(report.close, Some(CycleOutcome::Stopped)) {
            warn!("Skip opening {} after stop.", name);
        } else {
            report.open = Some(driver.run(Leg::Open).await?);
        }
    }
    Ok(report)
}
