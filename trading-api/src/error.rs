use thiserror::Error;

/// Failure of a single call against the exchange API.
///
/// The engine never retries on any of these; a failed call ends the
/// maintenance cycle (or shutdown attempt) it belongs to.
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// The request never produced a response (connect, timeout, TLS...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response envelope carried a non-zero return code.
    #[error("request rejected by exchange (ret_code={code}): {message}")]
    Rejected { code: i64, message: String },

    /// The body could not be decoded into the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// A notification could not be delivered.
#[derive(Error, Debug)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

pub type Result<T> = std::result::Result<T, ExchangeError>;
