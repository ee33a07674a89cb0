//! Order lifecycle for one symbol and one maintenance cycle.
//!
//! ```text
//! Placing --(qty < floor)--> Aborted
//!    |
//!    v
//! AwaitingFill --(filled, no leaves)--> Filled
//!    ^    |
//!    |    +--(cancelled)----------> replace at current best price
//!    |    +--(resting, price moved)-> open: cancel, settle, re-size, place
//!    |                                close: amend price in place
//!    +---------------------------------------+
//! ```

use super::send_notification;
use crate::error::Result;
use crate::quantity::order_quantity;
use log::{info, warn};
use rust_decimal::Decimal;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use trading::{
    Exchange, Notifier, OrderId, OrderRequest, OrderSnapshot, OrderStatus, Side, SymbolInfo,
};

/// Sleep lengths of the polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverTiming {
    poll_interval: Duration,
    settle_delay: Duration,
}

impl Default for DriverTiming {
    fn default() -> Self {
        Self::new(Duration::from_secs(20), Duration::from_secs(2))
    }
}

impl DriverTiming {
    pub fn new(poll_interval: Duration, settle_delay: Duration) -> Self {
        Self {
            poll_interval,
            settle_delay,
        }
    }

    /// Time between two status queries.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Time given to a cancel to land before the replacement is placed.
    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }
}

/// What the driver is doing to the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    /// Open (or add to) the short, sized from the available balance.
    Open,
    /// Buy back `quantity` contracts.
    Close { quantity: u64 },
}

impl Leg {
    pub fn side(&self) -> Side {
        match self {
            Leg::Open => Side::Sell,
            Leg::Close { .. } => Side::Buy,
        }
    }
}

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Filled(OrderSnapshot),
    /// The quantity fell below the lot-size floor; nothing was (re)placed.
    Aborted { quantity: u64, min_quantity: Decimal },
    /// The cancellation token fired. Any resting order is left to the
    /// shutdown path.
    Stopped,
}

pub struct OrderDriver<'a> {
    exchange: &'a dyn Exchange,
    notifier: &'a dyn Notifier,
    symbol: &'a SymbolInfo,
    timing: DriverTiming,
    cancel: CancellationToken,
}

impl<'a> OrderDriver<'a> {
    pub fn new(
        exchange: &'a dyn Exchange,
        notifier: &'a dyn Notifier,
        symbol: &'a SymbolInfo,
        timing: DriverTiming,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            exchange,
            notifier,
            symbol,
            timing,
            cancel,
        }
    }

    /// Drives one order to completion.
    ///
    /// Exchange failures end the cycle with an error; nothing is retried here.
    pub async fn run(&self, leg: Leg) -> Result<CycleOutcome> {
        let name = self.symbol.name();
        match leg {
            Leg::Open => info!("Create short position of {}.", name),
            Leg::Close { quantity } => info!("Close short position of {} {}.", quantity, name),
        }
        if self.cancel.is_cancelled() {
            return Ok(CycleOutcome::Stopped);
        }

        let side = leg.side();
        let price = self.best_price(side).await?;
        let quantity = self.size(leg, price, None).await?;
        let mut order_id = match self.place(side, quantity, price).await? {
            Some(id) => id,
            None => return Ok(self.aborted(quantity)),
        };

        loop {
            if !self.pause(self.timing.poll_interval).await {
                info!("Stop maintaining {}. order_id={}", name, order_id);
                return Ok(CycleOutcome::Stopped);
            }

            info!("Get active order: order_id={}", order_id);
            let order = self.exchange.order(name, &order_id).await?;
            info!(
                "Active order: status={:?}, side={}, price={}, qty={}, leaves_qty={}",
                order.status, order.side, order.price, order.quantity, order.leaves_quantity
            );

            match order.status {
                OrderStatus::Filled if order.is_fully_filled() => {
                    info!("Order was filled. order_id={}", order_id);
                    let text = match leg {
                        Leg::Open => {
                            format!("Created short position for {} {}.", order.quantity, order.symbol)
                        }
                        Leg::Close { .. } => format!(
                            "Short position was closed for {} {}.",
                            order.quantity, order.symbol
                        ),
                    };
                    send_notification(self.notifier, &text).await;
                    return Ok(CycleOutcome::Filled(order));
                }
                OrderStatus::Cancelled => {
                    info!(
                        "Order was cancelled. order_id={}, reason={}",
                        order_id,
                        order.reject_reason.as_deref().unwrap_or("-")
                    );
                    let price = self.best_price(order.side).await?;
                    let quantity = self.size(leg, price, Some(&order)).await?;
                    order_id = match self.place(order.side, quantity, price).await? {
                        Some(id) => id,
                        None => return Ok(self.aborted(quantity)),
                    };
                }
                OrderStatus::Created
                | OrderStatus::New
                | OrderStatus::PartiallyFilled
                | OrderStatus::PendingCancel
                | OrderStatus::Rejected
                | OrderStatus::Filled => {
                    if matches!(order.status, OrderStatus::Rejected | OrderStatus::Filled) {
                        warn!(
                            "Unexpected order state {:?} with leaves_qty={}; treating as resting. order_id={}",
                            order.status, order.leaves_quantity, order_id
                        );
                    }
                    info!("Order is not filled yet. order_id={}", order_id);

                    let price = self.best_price(order.side).await?;
                    if price == order.price {
                        info!("No need to update order.");
                        continue;
                    }
                    info!("Update order price. order_id={}", order_id);

                    match leg {
                        Leg::Open => {
                            info!("Cancel {} order to change price. order_id={}", order.side, order_id);
                            self.exchange.cancel_order(name, &order_id).await?;
                            if !self.pause(self.timing.settle_delay).await {
                                return Ok(CycleOutcome::Stopped);
                            }
                            let quantity = self.size(leg, price, Some(&order)).await?;
                            order_id = match self.place(order.side, quantity, price).await? {
                                Some(id) => id,
                                None => return Ok(self.aborted(quantity)),
                            };
                        }
                        Leg::Close { quantity } => {
                            info!(
                                "Replace {} order: symbol={}, price={}, qty={}",
                                order.side, name, price, quantity
                            );
                            order_id = self
                                .exchange
                                .amend_order(name, &order_id, quantity, price)
                                .await?;
                            info!("Order was replaced. order_id={}", order_id);
                        }
                    }
                }
            }
        }
    }

    /// Quantity for the next placement.
    ///
    /// Opening always re-sizes from the current balance. Closing uses the
    /// requested size, except after an exchange-side cancel where the
    /// cancelled order's own quantity is reused.
    async fn size(&self, leg: Leg, price: Decimal, previous: Option<&OrderSnapshot>) -> Result<u64> {
        match (leg, previous) {
            (Leg::Open, _) => {
                let coin = self.symbol.base_currency();
                let balance = self.exchange.balance(coin).await?;
                info!(
                    "Available balance: account=derivative, coin={}, balance={:.8}",
                    coin, balance
                );
                Ok(order_quantity(balance, price))
            }
            (Leg::Close { .. }, Some(order)) if order.status == OrderStatus::Cancelled => {
                Ok(order.quantity)
            }
            (Leg::Close { quantity }, _) => Ok(quantity),
        }
    }

    async fn best_price(&self, side: Side) -> Result<Decimal> {
        let price = self.exchange.best_price(self.symbol.name(), side).await?;
        info!("Best {} of {}: price={}", side.book_name(), self.symbol.name(), price);
        Ok(price)
    }

    /// Places a post-only order, or returns `None` if `quantity` is below the
    /// lot-size floor.
    async fn place(&self, side: Side, quantity: u64, price: Decimal) -> Result<Option<OrderId>> {
        if !self.symbol.accepts(quantity) {
            info!(
                "Can't create an order because qty({}) is less than min_trading_qty({}).",
                quantity,
                self.symbol.min_quantity()
            );
            return Ok(None);
        }
        info!(
            "Create an inverse perpetual order to {} {}. qty={}, price={}",
            side.as_str().to_lowercase(),
            self.symbol.name(),
            quantity,
            price
        );
        let request = OrderRequest::post_only(self.symbol.name(), side, quantity, price);
        let order_id = self.exchange.place_order(&request).await?;
        info!("Order created. order_id={}", order_id);
        Ok(Some(order_id))
    }

    fn aborted(&self, quantity: u64) -> CycleOutcome {
        CycleOutcome::Aborted {
            quantity,
            min_quantity: self.symbol.min_quantity(),
        }
    }

    /// Sleeps for `duration`. Returns `false` if the token fired first.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}
