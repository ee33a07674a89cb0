use crate::error::NotifyError;
use async_trait::async_trait;

/// Out-of-band channel for human-readable status messages.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str) -> Result<(), NotifyError>;
}
