//! Scripted exchange for driving the engine without a network.
//!
//! Prices and order statuses are consumed from per-symbol scripts; the last
//! entry of a script repeats forever. Every call is recorded with the tokio
//! clock so tests running on paused time can check ordering and delays.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;
use trading::error::Result;
use trading::{
    Exchange, ExchangeError, FundingRate, Notifier, NotifyError, OrderId, OrderRequest,
    OrderSnapshot, OrderStatus, Position, PositionSide, Side, SymbolInfo, WalletBalance,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    BestPrice { symbol: String, side: Side },
    Balance { coin: String },
    Place(OrderRequest),
    Query { symbol: String, order_id: OrderId },
    Cancel { symbol: String, order_id: OrderId },
    Amend {
        symbol: String,
        order_id: OrderId,
        quantity: u64,
        price: Decimal,
    },
    CancelAll { symbol: String },
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub call: Call,
    pub at: Instant,
}

#[derive(Default)]
struct State {
    symbols: Vec<SymbolInfo>,
    funding: HashMap<String, Decimal>,
    positions: BTreeMap<String, Decimal>,
    balances: BTreeMap<String, Decimal>,
    prices: HashMap<(String, Side), VecDeque<Decimal>>,
    statuses: HashMap<String, VecDeque<OrderStatus>>,
    orders: HashMap<OrderId, OrderSnapshot>,
    next_id: u64,
    calls: Vec<RecordedCall>,
    failing_cancel_all: HashSet<String>,
    failing_funding: HashSet<String>,
    panicking_position: HashSet<String>,
    failing_wallet: bool,
}

impl State {
    fn record(&mut self, call: Call) {
        self.calls.push(RecordedCall {
            call,
            at: Instant::now(),
        });
    }

    fn position(&self, symbol: &str) -> Position {
        match self.positions.get(symbol) {
            Some(size) if !size.is_zero() => Position {
                symbol: symbol.to_string(),
                side: PositionSide::Sell,
                size: *size,
            },
            _ => Position::flat(symbol),
        }
    }

    fn next_order_id(&mut self) -> OrderId {
        self.next_id += 1;
        OrderId::new(format!("order-{}", self.next_id))
    }
}

/// Pops the head of a script, keeping the last entry.
fn advance<T: Copy>(script: &mut VecDeque<T>) -> Option<T> {
    if script.len() > 1 {
        script.pop_front()
    } else {
        script.front().copied()
    }
}

pub struct MockExchange {
    state: Mutex<State>,
    funding_time: DateTime<Utc>,
}

impl Default for MockExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExchange {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            funding_time: DateTime::<Utc>::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_symbol(self, symbol: SymbolInfo) -> Self {
        self.lock().symbols.push(symbol);
        self
    }

    pub fn with_funding(self, symbol: &str, rate: Decimal) -> Self {
        self.lock().funding.insert(symbol.to_string(), rate);
        self
    }

    pub fn with_position(self, symbol: &str, size: Decimal) -> Self {
        self.lock().positions.insert(symbol.to_string(), size);
        self
    }

    /// Available balance of `coin`.
    pub fn with_balance(self, coin: &str, balance: Decimal) -> Self {
        self.lock().balances.insert(coin.to_string(), balance);
        self
    }

    pub fn with_prices(self, symbol: &str, side: Side, prices: Vec<Decimal>) -> Self {
        self.lock()
            .prices
            .insert((symbol.to_string(), side), prices.into());
        self
    }

    /// Statuses reported by successive order queries on `symbol`.
    pub fn script_statuses(self, symbol: &str, statuses: Vec<OrderStatus>) -> Self {
        self.lock()
            .statuses
            .insert(symbol.to_string(), statuses.into());
        self
    }

    pub fn fail_cancel_all(self, symbol: &str) -> Self {
        self.lock().failing_cancel_all.insert(symbol.to_string());
        self
    }

    pub fn fail_funding(self, symbol: &str) -> Self {
        self.lock().failing_funding.insert(symbol.to_string());
        self
    }

    /// Makes `position(symbol)` panic, as a bug in a collaborator would.
    pub fn panic_on_position(self, symbol: &str) -> Self {
        self.lock().panicking_position.insert(symbol.to_string());
        self
    }

    pub fn fail_wallet(self) -> Self {
        self.lock().failing_wallet = true;
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Placements in call order.
    pub fn placed(&self) -> Vec<OrderRequest> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match &c.call {
                Call::Place(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| matches(&c.call)).count()
    }
}

#[async_trait]
impl Exchange for MockExchange {
    async fn symbols(&self) -> Result<Vec<SymbolInfo>> {
        Ok(self.lock().symbols.clone())
    }

    async fn previous_funding(&self, symbol: &str) -> Result<FundingRate> {
        let state = self.lock();
        if state.failing_funding.contains(symbol) {
            return Err(ExchangeError::Transport(format!("funding of {symbol} unavailable")));
        }
        let rate = state
            .funding
            .get(symbol)
            .copied()
            .ok_or_else(|| ExchangeError::Decode(format!("no funding rate for {symbol}")))?;
        Ok(FundingRate {
            symbol: symbol.to_string(),
            rate,
            timestamp: self.funding_time,
        })
    }

    async fn best_price(&self, symbol: &str, side: Side) -> Result<Decimal> {
        let mut state = self.lock();
        state.record(Call::BestPrice {
            symbol: symbol.to_string(),
            side,
        });
        state
            .prices
            .get_mut(&(symbol.to_string(), side))
            .and_then(advance)
            .ok_or_else(|| ExchangeError::Decode(format!("empty {} book for {symbol}", side.book_name())))
    }

    async fn position(&self, symbol: &str) -> Result<Position> {
        let state = self.lock();
        if state.panicking_position.contains(symbol) {
            drop(state);
            panic!("position lookup for {symbol} blew up");
        }
        Ok(state.position(symbol))
    }

    async fn positions(&self) -> Result<Vec<Position>> {
        let state = self.lock();
        Ok(state
            .symbols
            .iter()
            .map(|s| state.position(s.name()))
            .collect())
    }

    async fn balance(&self, coin: &str) -> Result<Decimal> {
        let mut state = self.lock();
        state.record(Call::Balance {
            coin: coin.to_string(),
        });
        Ok(state.balances.get(coin).copied().unwrap_or(Decimal::ZERO))
    }

    async fn wallet(&self) -> Result<Vec<WalletBalance>> {
        let state = self.lock();
        if state.failing_wallet {
            return Err(ExchangeError::Http {
                status: 503,
                body: "wallet unavailable".into(),
            });
        }
        Ok(state
            .balances
            .iter()
            .map(|(coin, balance)| WalletBalance {
                coin: coin.clone(),
                wallet_balance: *balance,
                available_balance: *balance,
                unrealised_pnl: Decimal::ZERO,
            })
            .collect())
    }

    async fn place_order(&self, request: &OrderRequest) -> Result<OrderId> {
        let mut state = self.lock();
        state.record(Call::Place(request.clone()));
        let order_id = state.next_order_id();
        let snapshot = OrderSnapshot {
            order_id: order_id.clone(),
            symbol: request.symbol().to_string(),
            side: request.side(),
            status: OrderStatus::Created,
            price: request.price(),
            quantity: request.quantity(),
            leaves_quantity: request.quantity(),
            reject_reason: None,
        };
        state.orders.insert(order_id.clone(), snapshot);
        Ok(order_id)
    }

    async fn order(&self, symbol: &str, order_id: &OrderId) -> Result<OrderSnapshot> {
        let mut state = self.lock();
        state.record(Call::Query {
            symbol: symbol.to_string(),
            order_id: order_id.clone(),
        });
        let status = state
            .statuses
            .get_mut(symbol)
            .and_then(advance)
            .unwrap_or(OrderStatus::New);
        let order = state
            .orders
            .get_mut(order_id)
            .ok_or_else(|| ExchangeError::Rejected {
                code: 20001,
                message: format!("order {order_id} does not exist"),
            })?;
        order.status = status;
        order.leaves_quantity = match status {
            OrderStatus::Filled => 0,
            _ => order.quantity,
        };
        if status == OrderStatus::Cancelled {
            order.reject_reason = Some("EC_PostOnlyWillTakeLiquidity".into());
        }
        Ok(order.clone())
    }

    async fn cancel_order(&self, symbol: &str, order_id: &OrderId) -> Result<()> {
        let mut state = self.lock();
        state.record(Call::Cancel {
            symbol: symbol.to_string(),
            order_id: order_id.clone(),
        });
        if let Some(order) = state.orders.get_mut(order_id) {
            order.status = OrderStatus::Cancelled;
        }
        Ok(())
    }

    async fn amend_order(
        &self,
        symbol: &str,
        order_id: &OrderId,
        quantity: u64,
        price: Decimal,
    ) -> Result<OrderId> {
        let mut state = self.lock();
        state.record(Call::Amend {
            symbol: symbol.to_string(),
            order_id: order_id.clone(),
            quantity,
            price,
        });
        let mut order = state
            .orders
            .remove(order_id)
            .ok_or_else(|| ExchangeError::Rejected {
                code: 20001,
                message: format!("order {order_id} does not exist"),
            })?;
        let new_id = state.next_order_id();
        order.order_id = new_id.clone();
        order.quantity = quantity;
        order.leaves_quantity = quantity;
        order.price = price;
        state.orders.insert(new_id.clone(), order);
        Ok(new_id)
    }

    async fn cancel_all_orders(&self, symbol: &str) -> Result<()> {
        let mut state = self.lock();
        state.record(Call::CancelAll {
            symbol: symbol.to_string(),
        });
        if state.failing_cancel_all.contains(symbol) {
            return Err(ExchangeError::Transport(format!("cancel-all for {symbol} timed out")));
        }
        Ok(())
    }
}

/// Keeps every notification in memory.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
    failing: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every delivery fails.
    pub fn failing() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, text: &str) -> std::result::Result<(), NotifyError> {
        if self.failing {
            return Err(NotifyError("webhook unreachable".into()));
        }
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_string());
        Ok(())
    }
}
