use crate::engine::{DriverTiming, FundingThresholds, FundingWindow};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const ENV_PREFIX: &str = "FRBOT";
pub const ENV_API_KEY: &str = "BYBIT_APIKEY";
pub const ENV_API_SECRET: &str = "BYBIT_SECRET";
pub const ENV_TESTNET: &str = "BYBIT_TEST";
pub const ENV_SLACK_WEBHOOK: &str = "SLACK_WEBHOOK_URL";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn default_symbols() -> Vec<String> {
    ["BTCUSD", "ETHUSD", "XRPUSD", "EOSUSD"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_funding_hours() -> Vec<u32> {
    vec![7, 15, 23]
}

fn default_start_minute() -> u32 {
    45
}

fn default_poll_interval_secs() -> u64 {
    20
}

fn default_settle_delay_secs() -> u64 {
    2
}

fn default_window_check_secs() -> u64 {
    5
}

fn default_request_timeout_secs() -> u64 {
    10
}

/// Bot settings: defaults, overridden by an optional TOML file, overridden by
/// `FRBOT__*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Inverse perpetuals to maintain. Also the set the shutdown path cancels.
    #[serde(default = "default_symbols")]
    symbols: Vec<String>,
    /// UTC hours in which a funding window opens.
    #[serde(default = "default_funding_hours")]
    funding_hours: Vec<u32>,
    /// Minute of those hours from which the window counts as entered.
    #[serde(default = "default_start_minute")]
    start_minute: u32,
    /// Open a short when the previous funding rate is at least this.
    #[serde(default)]
    entry_threshold: Decimal,
    /// Close an open short when the previous funding rate is below this.
    #[serde(default)]
    exit_threshold: Decimal,
    #[serde(default = "default_poll_interval_secs")]
    poll_interval_secs: u64,
    #[serde(default = "default_settle_delay_secs")]
    settle_delay_secs: u64,
    #[serde(default = "default_window_check_secs")]
    window_check_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            funding_hours: default_funding_hours(),
            start_minute: default_start_minute(),
            entry_threshold: Decimal::ZERO,
            exit_threshold: Decimal::ZERO,
            poll_interval_secs: default_poll_interval_secs(),
            settle_delay_secs: default_settle_delay_secs(),
            window_check_secs: default_window_check_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl BotConfig {
    /// Loads and validates the configuration. A missing file is not an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path).required(false))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("symbols")
                    .with_list_parse_key("funding_hours"),
            )
            .build()?;
        let config: BotConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::Invalid("no symbols configured".into()));
        }
        let mut seen = std::collections::BTreeSet::new();
        if let Some(symbol) = self.symbols.iter().find(|s| !seen.insert(s.as_str())) {
            return Err(ConfigError::Invalid(format!("symbol {} listed twice", symbol)));
        }
        if self.funding_hours.is_empty() {
            return Err(ConfigError::Invalid("no funding hours configured".into()));
        }
        if let Some(hour) = self.funding_hours.iter().find(|h| **h > 23) {
            return Err(ConfigError::Invalid(format!("funding hour {} out of range", hour)));
        }
        if self.start_minute > 59 {
            return Err(ConfigError::Invalid(format!(
                "start minute {} out of range",
                self.start_minute
            )));
        }
        if self.poll_interval_secs == 0
            || self.settle_delay_secs == 0
            || self.window_check_secs == 0
            || self.request_timeout_secs == 0
        {
            return Err(ConfigError::Invalid("intervals must be non-zero".into()));
        }
        Ok(())
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn window(&self) -> FundingWindow {
        FundingWindow::new(self.funding_hours.clone(), self.start_minute)
    }

    pub fn thresholds(&self) -> FundingThresholds {
        FundingThresholds::new(self.entry_threshold, self.exit_threshold)
    }

    pub fn driver_timing(&self) -> DriverTiming {
        DriverTiming::new(
            Duration::from_secs(self.poll_interval_secs),
            Duration::from_secs(self.settle_delay_secs),
        )
    }

    pub fn window_check_interval(&self) -> Duration {
        Duration::from_secs(self.window_check_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Slack webhook from `SLACK_WEBHOOK_URL`. Empty or unset means log-only
/// notifications.
pub fn slack_webhook_url<F>(lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(ENV_SLACK_WEBHOOK).filter(|url| !url.trim().is_empty())
}

/// Credentials and environment selection, read from the process
/// environment under the names the deployment already uses.
#[derive(Clone)]
pub struct ExchangeSettings {
    api_key: String,
    api_secret: String,
    testnet: bool,
}

impl ExchangeSettings {
    pub fn from_env(force_testnet: bool) -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok(), force_testnet)
    }

    /// `BYBIT_TEST` selects testnet unless it is set to something other
    /// than "true"; an unset variable means testnet.
    pub fn from_lookup<F>(lookup: F, force_testnet: bool) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(ENV_API_KEY).ok_or(ConfigError::MissingEnv(ENV_API_KEY))?;
        let api_secret = lookup(ENV_API_SECRET).ok_or(ConfigError::MissingEnv(ENV_API_SECRET))?;
        let testnet = force_testnet
            || lookup(ENV_TESTNET)
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(true);
        Ok(Self {
            api_key,
            api_secret,
            testnet,
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }

    pub fn is_testnet(&self) -> bool {
        self.testnet
    }
}

impl std::fmt::Debug for ExchangeSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeSettings")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("testnet", &self.testnet)
            .finish()
    }
}
