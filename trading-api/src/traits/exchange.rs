use crate::error::Result;
use crate::model::{
    account::{Position, WalletBalance},
    funding::FundingRate,
    order::{OrderId, OrderRequest, OrderSnapshot, Side},
    symbol::SymbolInfo,
};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Everything the engine needs from a derivatives exchange.
///
/// Implementations are expected to surface every failure as an error and
/// never retry internally on the engine's behalf.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Contract catalog. Called once at startup.
    async fn symbols(&self) -> Result<Vec<SymbolInfo>>;

    /// Last settled funding rate of `symbol`.
    async fn previous_funding(&self, symbol: &str) -> Result<FundingRate>;

    /// Top of book on `side`: best bid for `Buy`, best ask for `Sell`.
    async fn best_price(&self, symbol: &str, side: Side) -> Result<Decimal>;

    async fn position(&self, symbol: &str) -> Result<Position>;

    /// Positions on every symbol, flat ones included.
    async fn positions(&self) -> Result<Vec<Position>>;

    /// Available balance of `coin` in the derivatives wallet.
    async fn balance(&self, coin: &str) -> Result<Decimal>;

    /// Every coin of the derivatives wallet.
    async fn wallet(&self) -> Result<Vec<WalletBalance>>;

    async fn place_order(&self, request: &OrderRequest) -> Result<OrderId>;

    async fn order(&self, symbol: &str, order_id: &OrderId) -> Result<OrderSnapshot>;

    async fn cancel_order(&self, symbol: &str, order_id: &OrderId) -> Result<()>;

    /// Atomically changes price and quantity of a resting order.
    ///
    /// Returns the id to track from now on.
    async fn amend_order(
        &self,
        symbol: &str,
        order_id: &OrderId,
        quantity: u64,
        price: Decimal,
    ) -> Result<OrderId>;

    async fn cancel_all_orders(&self, symbol: &str) -> Result<()>;
}
