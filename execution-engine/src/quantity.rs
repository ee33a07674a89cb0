//! Order sizing for inverse perpetuals.
//!
//! Quantities are whole contracts in the quote currency (USD), so the
//! margin-coin balance is converted at the reference price.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const SPOT_MAKER_FEE_RATE: Decimal = dec!(0.000);
pub const SPOT_TAKER_FEE_RATE: Decimal = dec!(0.001);
pub const DERIVATIVE_MAKER_FEE_RATE: Decimal = dec!(-0.00025);
pub const DERIVATIVE_TAKER_FEE_RATE: Decimal = dec!(0.00075);

/// `floor(price * balance * (1 - taker fee))`.
///
/// The taker fee is deducted even though orders are post-only so that the
/// position could still be closed at market. Results that are negative or
/// do not fit a `u64` come back as 0, which no lot-size floor accepts.
pub fn order_quantity(balance: Decimal, price: Decimal) -> u64 {
    let Some(notional) = price.checked_mul(balance) else {
        return 0;
    };
    let Some(fee) = notional.checked_mul(DERIVATIVE_TAKER_FEE_RATE) else {
        return 0;
    };
    (notional - fee).trunc().to_u64().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_one_coin_at_fifty_thousand() {
        assert_eq!(order_quantity(dec!(1.0), dec!(50000)), 49962);
    }

    #[test]
    fn test_zero_balance() {
        assert_eq!(order_quantity(Decimal::ZERO, dec!(50000)), 0);
    }

    #[test]
    fn test_fractional_balance_truncates() {
        // 9487.5 * 0.0123 = 116.69625, less a 0.0875 fee
        assert_eq!(order_quantity(dec!(0.0123), dec!(9487.5)), 116);
    }

    #[test]
    fn test_negative_balance_is_zero() {
        assert_eq!(order_quantity(dec!(-1), dec!(100)), 0);
    }

    proptest! {
        #[test]
        fn prop_quantity_is_floor_of_fee_adjusted_notional(
            sats in 0u64..100_000_000_000u64,
            tenths in 1u64..20_000_000u64,
        ) {
            let balance = Decimal::new(sats as i64, 8);
            let price = Decimal::new(tenths as i64, 1);
            let qty = order_quantity(balance, price);

            let expected = (price * balance * (Decimal::ONE - DERIVATIVE_TAKER_FEE_RATE)).floor();
            prop_assert_eq!(Decimal::from(qty), expected);
            prop_assert!(Decimal::from(qty) <= price * balance);
        }
    }
}
