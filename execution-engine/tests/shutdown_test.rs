use execution_engine::engine::ShutdownHandler;
use execution_engine::exchange::{Call, MockExchange};
use std::sync::Arc;

fn symbols() -> Vec<String> {
    ["BTCUSD", "ETHUSD", "XRPUSD", "EOSUSD"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[tokio::test]
async fn test_cancels_every_tracked_symbol() {
    let exchange = Arc::new(MockExchange::new());
    let handler = ShutdownHandler::new(exchange.clone(), symbols());

    let report = handler.cancel_all().await;

    assert!(report.is_clean());
    assert_eq!(report.attempted, symbols());
    assert_eq!(exchange.count(|c| matches!(c, Call::CancelAll { .. })), 4);
}

#[tokio::test]
async fn test_failures_do_not_skip_remaining_symbols() {
    let _ = env_logger::builder().is_test(true).try_init();
    let exchange = Arc::new(
        MockExchange::new()
            .fail_cancel_all("BTCUSD")
            .fail_cancel_all("XRPUSD"),
    );
    let handler = ShutdownHandler::new(exchange.clone(), symbols());

    let report = handler.cancel_all().await;

    assert_eq!(report.attempted.len(), 4);
    let failed: Vec<&str> = report.failed.iter().map(|(s, _)| s.as_str()).collect();
    assert_eq!(failed, vec!["BTCUSD", "XRPUSD"]);

    let order: Vec<String> = exchange
        .calls()
        .into_iter()
        .filter_map(|c| match c.call {
            Call::CancelAll { symbol } => Some(symbol),
            _ => None,
        })
        .collect();
    assert_eq!(order, symbols());
}
