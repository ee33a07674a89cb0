use super::*;
use crate::error::EngineError;
use crate::exchange::mock::{Call, MockExchange, RecordingNotifier};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use trading::{ExchangeError, OrderId, OrderStatus, Side, SymbolInfo};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn btcusd(min_quantity: Decimal) -> SymbolInfo {
    SymbolInfo::new("BTCUSD", "BTC", min_quantity)
}

fn driver<'a>(
    exchange: &'a MockExchange,
    notifier: &'a RecordingNotifier,
    symbol: &'a SymbolInfo,
    cancel: CancellationToken,
) -> OrderDriver<'a> {
    OrderDriver::new(exchange, notifier, symbol, DriverTiming::default(), cancel)
}

fn position_of(calls: &[crate::exchange::RecordedCall], matches: impl Fn(&Call) -> bool) -> Vec<usize> {
    calls
        .iter()
        .enumerate()
        .filter(|(_, c)| matches(&c.call))
        .map(|(i, _)| i)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_open_aborts_below_lot_size_floor() {
    init_logging();
    let exchange = MockExchange::new()
        .with_balance("BTC", dec!(1.0))
        .with_prices("BTCUSD", Side::Sell, vec![dec!(50000)]);
    let notifier = RecordingNotifier::new();
    let symbol = btcusd(dec!(50000));

    let outcome = driver(&exchange, &notifier, &symbol, CancellationToken::new())
        .run(Leg::Open)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        CycleOutcome::Aborted {
            quantity: 49962,
            min_quantity: dec!(50000)
        }
    );
    assert!(exchange.placed().is_empty());
    assert!(notifier.messages().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_open_fills_on_first_poll() {
    init_logging();
    let exchange = MockExchange::new()
        .with_balance("BTC", dec!(1))
        .with_prices("BTCUSD", Side::Sell, vec![dec!(100)])
        .script_statuses("BTCUSD", vec![OrderStatus::Filled]);
    let notifier = RecordingNotifier::new();
    let symbol = btcusd(dec!(1));

    let outcome = driver(&exchange, &notifier, &symbol, CancellationToken::new())
        .run(Leg::Open)
        .await
        .unwrap();

    let placed = exchange.placed();
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].side(), Side::Sell);
    assert_eq!(placed[0].quantity(), 99);
    assert_eq!(placed[0].price(), dec!(100));
    assert!(placed[0].is_post_only());

    match outcome {
        CycleOutcome::Filled(order) => {
            assert_eq!(order.order_id, OrderId::new("order-1"));
            assert_eq!(order.leaves_quantity, 0);
        }
        other => panic!("expected a fill, got {:?}", other),
    }
    assert_eq!(
        notifier.messages(),
        vec!["Created short position for 99 BTCUSD.".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_first_query_waits_for_poll_interval() {
    init_logging();
    let exchange = MockExchange::new()
        .with_balance("BTC", dec!(1))
        .with_prices("BTCUSD", Side::Sell, vec![dec!(100)])
        .script_statuses("BTCUSD", vec![OrderStatus::Filled]);
    let notifier = RecordingNotifier::new();
    let symbol = btcusd(dec!(1));

    driver(&exchange, &notifier, &symbol, CancellationToken::new())
        .run(Leg::Open)
        .await
        .unwrap();

    let calls = exchange.calls();
    let place = position_of(&calls, |c| matches!(c, Call::Place(_)))[0];
    let query = position_of(&calls, |c| matches!(c, Call::Query { .. }))[0];
    assert!(calls[query].at - calls[place].at >= Duration::from_secs(20));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_order_is_replaced_before_next_poll() {
    init_logging();
    let exchange = MockExchange::new()
        .with_balance("BTC", dec!(1))
        .with_prices("BTCUSD", Side::Sell, vec![dec!(100), dec!(101)])
        .script_statuses("BTCUSD", vec![OrderStatus::Cancelled, OrderStatus::Filled]);
    let notifier = RecordingNotifier::new();
    let symbol = btcusd(dec!(1));

    let outcome = driver(&exchange, &notifier, &symbol, CancellationToken::new())
        .run(Leg::Open)
        .await
        .unwrap();

    let placed = exchange.placed();
    assert_eq!(placed.len(), 2);
    assert_eq!((placed[0].quantity(), placed[0].price()), (99, dec!(100)));
    // re-sized from the balance at the new price
    assert_eq!((placed[1].quantity(), placed[1].price()), (100, dec!(101)));

    let calls = exchange.calls();
    let queries = position_of(&calls, |c| matches!(c, Call::Query { .. }));
    let places = position_of(&calls, |c| matches!(c, Call::Place(_)));
    assert_eq!(queries.len(), 2);
    assert!(queries[0] < places[1] && places[1] < queries[1]);
    assert_eq!(exchange.count(|c| matches!(c, Call::Cancel { .. })), 0);

    match outcome {
        CycleOutcome::Filled(order) => assert_eq!(order.order_id, OrderId::new("order-2")),
        other => panic!("expected a fill, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_open_reprice_cancels_settles_and_places_new_order() {
    init_logging();
    let exchange = MockExchange::new()
        .with_balance("BTC", dec!(1))
        .with_prices("BTCUSD", Side::Sell, vec![dec!(100), dec!(100), dec!(101)])
        .script_statuses(
            "BTCUSD",
            vec![OrderStatus::New, OrderStatus::New, OrderStatus::Filled],
        );
    let notifier = RecordingNotifier::new();
    let symbol = btcusd(dec!(1));

    let outcome = driver(&exchange, &notifier, &symbol, CancellationToken::new())
        .run(Leg::Open)
        .await
        .unwrap();

    let calls = exchange.calls();
    let cancels = position_of(&calls, |c| matches!(c, Call::Cancel { .. }));
    let places = position_of(&calls, |c| matches!(c, Call::Place(_)));
    assert_eq!(cancels.len(), 1);
    assert_eq!(places.len(), 2);
    assert!(cancels[0] < places[1]);
    assert!(calls[places[1]].at - calls[cancels[0]].at >= Duration::from_secs(2));
    assert_eq!(
        calls[cancels[0]].call,
        Call::Cancel {
            symbol: "BTCUSD".into(),
            order_id: OrderId::new("order-1")
        }
    );
    assert_eq!(exchange.count(|c| matches!(c, Call::Amend { .. })), 0);

    match outcome {
        CycleOutcome::Filled(order) => {
            assert_eq!(order.order_id, OrderId::new("order-2"));
            assert_eq!(order.price, dec!(101));
            assert_eq!(order.quantity, 100);
        }
        other => panic!("expected a fill, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_unchanged_price_leaves_order_alone() {
    init_logging();
    let exchange = MockExchange::new()
        .with_balance("BTC", dec!(1))
        .with_prices("BTCUSD", Side::Sell, vec![dec!(100)])
        .script_statuses(
            "BTCUSD",
            vec![OrderStatus::New, OrderStatus::PartiallyFilled, OrderStatus::Filled],
        );
    let notifier = RecordingNotifier::new();
    let symbol = btcusd(dec!(1));

    driver(&exchange, &notifier, &symbol, CancellationToken::new())
        .run(Leg::Open)
        .await
        .unwrap();

    assert_eq!(exchange.placed().len(), 1);
    assert_eq!(exchange.count(|c| matches!(c, Call::Query { .. })), 3);
    assert_eq!(exchange.count(|c| matches!(c, Call::Cancel { .. })), 0);
}

#[tokio::test(start_paused = true)]
async fn test_close_reprice_amends_in_place() {
    init_logging();
    let exchange = MockExchange::new()
        .with_prices("BTCUSD", Side::Buy, vec![dec!(100), dec!(101)])
        .script_statuses("BTCUSD", vec![OrderStatus::New, OrderStatus::Filled]);
    let notifier = RecordingNotifier::new();
    let symbol = btcusd(dec!(1));

    let outcome = driver(&exchange, &notifier, &symbol, CancellationToken::new())
        .run(Leg::Close { quantity: 500 })
        .await
        .unwrap();

    let placed = exchange.placed();
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].side(), Side::Buy);
    assert_eq!(placed[0].quantity(), 500);
    assert_eq!(exchange.count(|c| matches!(c, Call::Cancel { .. })), 0);
    assert_eq!(
        exchange.count(|c| {
            *c == Call::Amend {
                symbol: "BTCUSD".into(),
                order_id: OrderId::new("order-1"),
                quantity: 500,
                price: dec!(101),
            }
        }),
        1
    );

    // the amended id is the one polled afterwards
    let calls = exchange.calls();
    let last_query = calls
        .iter()
        .rev()
        .find_map(|c| match &c.call {
            Call::Query { order_id, .. } => Some(order_id.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(last_query, OrderId::new("order-2"));

    assert!(matches!(outcome, CycleOutcome::Filled(_)));
    assert_eq!(
        notifier.messages(),
        vec!["Short position was closed for 500 BTCUSD.".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_close_cancelled_reuses_order_quantity_without_balance() {
    init_logging();
    let exchange = MockExchange::new()
        .with_prices("BTCUSD", Side::Buy, vec![dec!(100)])
        .script_statuses("BTCUSD", vec![OrderStatus::Cancelled, OrderStatus::Filled]);
    let notifier = RecordingNotifier::new();
    let symbol = btcusd(dec!(1));

    driver(&exchange, &notifier, &symbol, CancellationToken::new())
        .run(Leg::Close { quantity: 500 })
        .await
        .unwrap();

    let placed = exchange.placed();
    assert_eq!(placed.len(), 2);
    assert_eq!((placed[1].side(), placed[1].quantity()), (Side::Buy, 500));
    assert_eq!(exchange.count(|c| matches!(c, Call::Balance { .. })), 0);
}

#[tokio::test(start_paused = true)]
async fn test_reprice_below_floor_aborts_after_cancel() {
    init_logging();
    let exchange = MockExchange::new()
        .with_balance("BTC", dec!(1))
        .with_prices("BTCUSD", Side::Sell, vec![dec!(100), dec!(90)])
        .script_statuses("BTCUSD", vec![OrderStatus::New]);
    let notifier = RecordingNotifier::new();
    let symbol = btcusd(dec!(95));

    let outcome = driver(&exchange, &notifier, &symbol, CancellationToken::new())
        .run(Leg::Open)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        CycleOutcome::Aborted {
            quantity: 89,
            min_quantity: dec!(95)
        }
    );
    assert_eq!(exchange.placed().len(), 1);
    assert_eq!(exchange.count(|c| matches!(c, Call::Cancel { .. })), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_status_is_treated_as_resting() {
    init_logging();
    let exchange = MockExchange::new()
        .with_balance("BTC", dec!(1))
        .with_prices("BTCUSD", Side::Sell, vec![dec!(100)])
        .script_statuses("BTCUSD", vec![OrderStatus::Rejected, OrderStatus::Filled]);
    let notifier = RecordingNotifier::new();
    let symbol = btcusd(dec!(1));

    let outcome = driver(&exchange, &notifier, &symbol, CancellationToken::new())
        .run(Leg::Open)
        .await
        .unwrap();

    assert!(matches!(outcome, CycleOutcome::Filled(_)));
    assert_eq!(exchange.placed().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_missing_book_fails_the_cycle() {
    init_logging();
    let exchange = MockExchange::new().with_balance("BTC", dec!(1));
    let notifier = RecordingNotifier::new();
    let symbol = btcusd(dec!(1));

    let err = driver(&exchange, &notifier, &symbol, CancellationToken::new())
        .run(Leg::Open)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Exchange(ExchangeError::Decode(_))));
    assert!(exchange.placed().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_token_stops_before_placing() {
    init_logging();
    let exchange = MockExchange::new()
        .with_balance("BTC", dec!(1))
        .with_prices("BTCUSD", Side::Sell, vec![dec!(100)]);
    let notifier = RecordingNotifier::new();
    let symbol = btcusd(dec!(1));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = driver(&exchange, &notifier, &symbol, cancel)
        .run(Leg::Open)
        .await
        .unwrap();

    assert_eq!(outcome, CycleOutcome::Stopped);
    assert!(exchange.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_token_interrupts_polling() {
    init_logging();
    let exchange = MockExchange::new()
        .with_balance("BTC", dec!(1))
        .with_prices("BTCUSD", Side::Sell, vec![dec!(100)])
        .script_statuses("BTCUSD", vec![OrderStatus::New]);
    let notifier = RecordingNotifier::new();
    let symbol = btcusd(dec!(1));
    let cancel = CancellationToken::new();
    let driver = driver(&exchange, &notifier, &symbol, cancel.clone());

    let (outcome, _) = tokio::join!(driver.run(Leg::Open), async {
        tokio::time::sleep(Duration::from_secs(50)).await;
        cancel.cancel();
    });

    assert_eq!(outcome.unwrap(), CycleOutcome::Stopped);
    assert_eq!(exchange.placed().len(), 1);
    assert_eq!(exchange.count(|c| matches!(c, Call::Query { .. })), 2);
}

#[tokio::test(start_paused = true)]
async fn test_notification_failure_does_not_fail_cycle() {
    init_logging();
    let exchange = MockExchange::new()
        .with_balance("BTC", dec!(1))
        .with_prices("BTCUSD", Side::Sell, vec![dec!(100)])
        .script_statuses("BTCUSD", vec![OrderStatus::Filled]);
    let notifier = RecordingNotifier::failing();
    let symbol = btcusd(dec!(1));

    let outcome = driver(&exchange, &notifier, &symbol, CancellationToken::new())
        .run(Leg::Open)
        .await
        .unwrap();

    assert!(matches!(outcome, CycleOutcome::Filled(_)));
}
