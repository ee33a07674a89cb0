//! Consolidated report sent after every funding window.

use crate::error::Result;
use chrono::{DateTime, Utc};
use log::info;
use rust_decimal::Decimal;
use trading::{Exchange, FundingRate, Position, WalletBalance};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Fetches funding rates, wallet balances and positions, then formats them.
pub async fn build_summary(
    exchange: &dyn Exchange,
    symbols: &[String],
    now: DateTime<Utc>,
) -> Result<String> {
    let mut rates = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        rates.push(exchange.previous_funding(symbol).await?);
    }
    let positions = exchange.positions().await?;
    let balances = exchange.wallet().await?;
    info!(
        "Window summary: {} rates, {} balances, {} positions.",
        rates.len(),
        balances.len(),
        positions.len()
    );
    Ok(format_summary(now, &rates, &balances, &positions))
}

/// Renders the summary text. Zero balances and flat positions are omitted.
pub fn format_summary(
    now: DateTime<Utc>,
    rates: &[FundingRate],
    balances: &[WalletBalance],
    positions: &[Position],
) -> String {
    let rate_line = rates
        .iter()
        .map(|f| format!("{}={:.6}%", f.symbol, f.rate * Decimal::ONE_HUNDRED))
        .collect::<Vec<_>>()
        .join(", ");
    let rate_time = rates
        .first()
        .map(|f| format!(" ({} UTC)", f.timestamp.format(TIME_FORMAT)))
        .unwrap_or_default();

    let balance_line = balances
        .iter()
        .filter(|b| !b.wallet_balance.is_zero())
        .map(|b| {
            format!(
                "{}: balance={:.6}, unrealised_pnl={:.6}",
                b.coin, b.wallet_balance, b.unrealised_pnl
            )
        })
        .collect::<Vec<_>>()
        .join(", ");

    let position_line = positions
        .iter()
        .filter(|p| p.is_open())
        .map(|p| format!("{}={}", p.symbol, p.size.normalize()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "bybit-frbot maintained result ({} UTC).\n```\n[PrevFR]\n{}{}\n\n[Balance(derivative)]\n{}\n\n[Positions]\n{}\n```\n",
        now.format(TIME_FORMAT),
        rate_line,
        rate_time,
        balance_line,
        position_line
    )
}
