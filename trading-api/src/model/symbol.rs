use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Static description of a tradable contract, taken from the exchange
/// catalog at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolInfo {
    /// Contract name, e.g. "BTCUSD".
    name: String,
    /// Coin the contract is margined in, e.g. "BTC".
    base_currency: String,
    /// Lot-size floor: smallest quantity the exchange accepts.
    min_quantity: Decimal,
}

impl SymbolInfo {
    pub fn new(
        name: impl Into<String>,
        base_currency: impl Into<String>,
        min_quantity: Decimal,
    ) -> Self {
        Self {
            name: name.into(),
            base_currency: base_currency.into(),
            min_quantity,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_currency(&self) -> &str {
        &self.base_currency
    }

    pub fn min_quantity(&self) -> Decimal {
        self.min_quantity
    }

    /// Whether `quantity` clears the lot-size floor.
    pub fn accepts(&self, quantity: u64) -> bool {
        Decimal::from(quantity) >= self.min_quantity
    }
}
