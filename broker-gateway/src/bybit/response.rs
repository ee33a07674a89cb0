//! Wire shapes of the v2 REST API and their conversion into domain types.

use chrono::DateTime;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use trading::{
    ExchangeError, FundingRate, OrderId, OrderSnapshot, OrderStatus, Position, PositionSide, Side,
    SymbolInfo, WalletBalance,
};

#[derive(Debug, Deserialize)]
struct Envelope {
    ret_code: i64,
    #[serde(default)]
    ret_msg: String,
    #[serde(default)]
    result: Option<Value>,
}

/// Unwraps `{ret_code, ret_msg, result}` and decodes `result` as `T`.
pub fn decode_envelope<T: DeserializeOwned>(body: &str) -> Result<T, ExchangeError> {
    let envelope: Envelope =
        serde_json::from_str(body).map_err(|e| ExchangeError::Decode(e.to_string()))?;
    if envelope.ret_code != 0 {
        return Err(ExchangeError::Rejected {
            code: envelope.ret_code,
            message: envelope.ret_msg,
        });
    }
    serde_json::from_value(envelope.result.unwrap_or(Value::Null))
        .map_err(|e| ExchangeError::Decode(e.to_string()))
}

#[derive(Debug, Deserialize)]
pub struct RawSymbol {
    name: String,
    base_currency: String,
    lot_size_filter: RawLotSize,
}

#[derive(Debug, Deserialize)]
struct RawLotSize {
    min_trading_qty: Decimal,
}

impl From<RawSymbol> for SymbolInfo {
    fn from(raw: RawSymbol) -> Self {
        SymbolInfo::new(raw.name, raw.base_currency, raw.lot_size_filter.min_trading_qty)
    }
}

#[derive(Debug, Deserialize)]
pub struct RawFunding {
    symbol: String,
    funding_rate: Decimal,
    /// Unix seconds.
    funding_rate_timestamp: i64,
}

impl TryFrom<RawFunding> for FundingRate {
    type Error = ExchangeError;

    fn try_from(raw: RawFunding) -> Result<Self, Self::Error> {
        let timestamp = DateTime::from_timestamp(raw.funding_rate_timestamp, 0).ok_or_else(|| {
            ExchangeError::Decode(format!(
                "funding timestamp out of range: {}",
                raw.funding_rate_timestamp
            ))
        })?;
        Ok(FundingRate {
            symbol: raw.symbol,
            rate: raw.funding_rate,
            timestamp,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct RawBookLevel {
    price: Decimal,
    side: Side,
}

/// The first level on `side`; the book lists each side best-first.
pub fn best_of_side(levels: &[RawBookLevel], side: Side) -> Result<Decimal, ExchangeError> {
    levels
        .iter()
        .find(|level| level.side == side)
        .map(|level| level.price)
        .ok_or_else(|| ExchangeError::Decode(format!("order book has no {} levels", side)))
}

#[derive(Debug, Deserialize)]
pub struct RawPosition {
    symbol: String,
    side: PositionSide,
    size: Decimal,
}

impl From<RawPosition> for Position {
    fn from(raw: RawPosition) -> Self {
        Position {
            symbol: raw.symbol,
            side: raw.side,
            size: raw.size,
        }
    }
}

/// Element of the position list returned when no symbol is given.
#[derive(Debug, Deserialize)]
pub struct RawPositionEntry {
    pub data: RawPosition,
}

#[derive(Debug, Deserialize)]
pub struct RawWallet {
    wallet_balance: Decimal,
    available_balance: Decimal,
    unrealised_pnl: Decimal,
}

pub type RawWallets = BTreeMap<String, RawWallet>;

pub fn wallet_balances(raw: RawWallets) -> Vec<WalletBalance> {
    raw.into_iter()
        .map(|(coin, w)| WalletBalance {
            coin,
            wallet_balance: w.wallet_balance,
            available_balance: w.available_balance,
            unrealised_pnl: w.unrealised_pnl,
        })
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct RawOrder {
    order_id: String,
    symbol: String,
    side: Side,
    order_status: OrderStatus,
    price: Decimal,
    qty: u64,
    leaves_qty: u64,
    #[serde(default)]
    reject_reason: Option<String>,
}

impl From<RawOrder> for OrderSnapshot {
    fn from(raw: RawOrder) -> Self {
        OrderSnapshot {
            order_id: OrderId::new(raw.order_id),
            symbol: raw.symbol,
            side: raw.side,
            status: raw.order_status,
            price: raw.price,
            quantity: raw.qty,
            leaves_quantity: raw.leaves_qty,
            reject_reason: raw.reject_reason,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RawOrderAck {
    pub order_id: String,
}
