//! Funding-window maintenance: the per-order driver, the window scheduler
//! that fans drivers out, and the shutdown sweep.

mod driver;
mod scheduler;
mod shutdown;
mod summary;
mod window;

pub use driver::{CycleOutcome, DriverTiming, Leg, OrderDriver};
pub use scheduler::{
    maintain_position, FundingThresholds, MaintenanceReport, Scheduler, WindowReport,
};
pub use shutdown::{wait_for_signal, ShutdownHandler, ShutdownReport};
pub use summary::{build_summary, format_summary};
pub use window::FundingWindow;

use log::warn;
use trading::Notifier;

/// Delivers `text`, logging instead of failing.
pub(crate) async fn send_notification(notifier: &dyn Notifier, text: &str) {
    if let Err(e) = notifier.notify(text).await {
        warn!("Failed to send notification: {}", e);
    }
}

#[cfg(test)]
mod tests;
