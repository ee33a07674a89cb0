//! Concrete collaborators for the funding-rate engine: the Bybit
//! inverse-perpetual REST client and the notification sinks.

pub mod bybit;
pub mod notify;

pub use bybit::{BybitClient, Credentials, Network};
pub use notify::{LogNotifier, SlackNotifier};
