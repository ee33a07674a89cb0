use async_trait::async_trait;
use log::info;
use reqwest::Client;
use serde_json::json;
use trading::{Notifier, NotifyError};

/// Posts messages to a Slack incoming webhook.
pub struct SlackNotifier {
    http: Client,
    webhook_url: String,
}

impl SlackNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            webhook_url: webhook_url.into(),
        }
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, text: &str) -> Result<(), NotifyError> {
        self.http
            .post(&self.webhook_url)
            .json(&json!({ "text": text }))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| NotifyError(e.to_string()))?;
        Ok(())
    }
}

/// Fallback used when no webhook is configured: messages only reach the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, text: &str) -> Result<(), NotifyError> {
        info!("[notify] {}", text);
        Ok(())
    }
}
