use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Side of an open position. `None` means flat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSide {
    Buy,
    Sell,
    None,
}

/// Open exposure on one symbol, fetched fresh for every cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub side: PositionSide,
    /// Size in contracts (quote currency for inverse perpetuals).
    pub size: Decimal,
}

impl Position {
    pub fn flat(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            side: PositionSide::None,
            size: Decimal::ZERO,
        }
    }

    pub fn is_open(&self) -> bool {
        self.size > Decimal::ZERO
    }
}

/// Derivative wallet figures for one coin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletBalance {
    pub coin: String,
    pub wallet_balance: Decimal,
    pub available_balance: Decimal,
    pub unrealised_pnl: Decimal,
}
