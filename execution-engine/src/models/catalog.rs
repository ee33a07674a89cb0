use crate::error::{EngineError, Result};
use log::info;
use std::collections::HashMap;
use trading::{Exchange, SymbolInfo};

/// Contract metadata keyed by symbol name.
///
/// Built once at startup and shared read-only between tasks.
#[derive(Debug, Clone, Default)]
pub struct SymbolCatalog {
    symbols: HashMap<String, SymbolInfo>,
}

impl SymbolCatalog {
    pub fn new(symbols: impl IntoIterator<Item = SymbolInfo>) -> Self {
        Self {
            symbols: symbols
                .into_iter()
                .map(|s| (s.name().to_string(), s))
                .collect(),
        }
    }

    /// Fetches the exchange's contract list.
    pub async fn load(exchange: &dyn Exchange) -> Result<Self> {
        let symbols = exchange.symbols().await?;
        info!("Loaded {} symbols from the exchange catalog", symbols.len());
        Ok(Self::new(symbols))
    }

    pub fn get(&self, name: &str) -> Option<&SymbolInfo> {
        self.symbols.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&SymbolInfo> {
        self.get(name)
            .ok_or_else(|| EngineError::UnknownSymbol(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_require_unknown_symbol() {
        let catalog = SymbolCatalog::new(vec![SymbolInfo::new("BTCUSD", "BTC", dec!(1))]);
        assert_eq!(catalog.require("BTCUSD").unwrap().base_currency(), "BTC");
        assert!(matches!(
            catalog.require("DOGEUSD"),
            Err(EngineError::UnknownSymbol(name)) if name == "DOGEUSD"
        ));
    }
}
