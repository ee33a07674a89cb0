use thiserror::Error;
use trading::ExchangeError;

#[derive(Error, Debug)]
pub enum EngineError {
    /// A collaborator call failed; the cycle it belonged to is abandoned.
    #[error("exchange call failed: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("symbol {0} is not listed by the exchange")]
    UnknownSymbol(String),

    #[error("symbol {0} is tracked more than once")]
    DuplicateSymbol(String),

    #[error("no symbols to track")]
    NoSymbols,
}

pub type Result<T> = std::result::Result<T, EngineError>;
