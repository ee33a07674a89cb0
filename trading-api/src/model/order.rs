//! Orders as seen by the exchange.
//!
//! The engine keeps only an [`OrderId`] between polls; every decision is made
//! on a fresh [`OrderSnapshot`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of an order. On the inverse perpetuals we trade, `Sell` opens
/// the short and `Buy` closes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "Buy",
            Side::Sell => "Sell",
        }
    }

    /// Name of the book side this order would rest on.
    pub fn book_name(&self) -> &'static str {
        match self {
            Side::Buy => "Bid",
            Side::Sell => "Ask",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status reported by the exchange.
///
/// Unknown strings fail to deserialize instead of falling through to a
/// default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Accepted by the matching engine but not yet on the book.
    Created,
    /// Resting on the book.
    New,
    PartiallyFilled,
    /// A cancel has been requested and not yet confirmed.
    PendingCancel,
    Filled,
    Cancelled,
    Rejected,
}

/// Exchange-assigned order identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A limit order to be placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    symbol: String,
    side: Side,
    /// Whole contracts, denominated in the quote currency.
    quantity: u64,
    price: Decimal,
    post_only: bool,
}

impl OrderRequest {
    /// Creates a post-only limit order, the only kind the bot places.
    pub fn post_only(symbol: impl Into<String>, side: Side, quantity: u64, price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            quantity,
            price,
            post_only: true,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn is_post_only(&self) -> bool {
        self.post_only
    }
}

/// Authoritative state of one order at the time it was queried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub order_id: OrderId,
    pub symbol: String,
    pub side: Side,
    pub status: OrderStatus,
    pub price: Decimal,
    pub quantity: u64,
    /// Quantity still unfilled.
    pub leaves_quantity: u64,
    #[serde(default)]
    pub reject_reason: Option<String>,
}

impl OrderSnapshot {
    /// True once the order is filled with nothing left on the book.
    pub fn is_fully_filled(&self) -> bool {
        self.status == OrderStatus::Filled && self.leaves_quantity == 0
    }
}
