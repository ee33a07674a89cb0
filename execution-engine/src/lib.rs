//! Funding-rate position maintenance engine.
//!
//! - `quantity`: order sizing from balance and price.
//! - `engine`: the per-symbol order driver, the funding-window scheduler and
//!   the shutdown path.
//! - `models`: symbol catalog and bot configuration.
//! - `exchange`: a scripted in-memory exchange for tests.
//! - `io`: command-line arguments.

pub mod engine;
pub mod error;
pub mod exchange;
pub mod io;
pub mod models;
pub mod quantity;

pub use error::EngineError;
