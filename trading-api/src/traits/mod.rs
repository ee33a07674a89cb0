pub mod exchange;
pub mod notifier;
