//! Domain model and collaborator traits shared by the funding-rate bot crates.
//!
//! The engine only talks to an exchange through [`Exchange`] and reports
//! outcomes through [`Notifier`]; concrete implementations live in
//! `broker-gateway`.

pub mod error;
pub mod model;
pub mod traits;

pub use error::{ExchangeError, NotifyError};
pub use model::account::{Position, PositionSide, WalletBalance};
pub use model::funding::FundingRate;
pub use model::order::{OrderId, OrderRequest, OrderSnapshot, OrderStatus, Side};
pub use model::symbol::SymbolInfo;
pub use traits::exchange::Exchange;
pub use traits::notifier::Notifier;
