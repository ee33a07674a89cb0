use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The most recently settled funding rate of a perpetual contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingRate {
    pub symbol: String,
    /// Rate as a fraction (0.0001 == 0.01%).
    pub rate: Decimal,
    /// When the rate was (or will be) applied.
    pub timestamp: DateTime<Utc>,
}
