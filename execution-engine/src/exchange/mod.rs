//! In-process exchange doubles.

pub mod mock;

pub use mock::{Call, MockExchange, RecordedCall, RecordingNotifier};
