//! ZNC is a 2-decimal fixed-point currency (spec.md Glossary). Amounts are
//! quantized half-to-even ("banker's rounding", spec.md §4.1) and bounded
//! to 8 integer digits + 2 fractional digits.

use crate::error::ZncProxyError;
use rust_decimal::{Decimal, RoundingStrategy};

/// Maximum magnitude a ZNC amount may have: 8 integer digits, 2 fractional.
fn max_magnitude() -> Decimal {
    Decimal::new(99_999_999_99, 2)
}

/// Round to 2 fractional digits using half-to-even, then reject if the
/// result exceeds the storage bound (spec.md §4.1 Overflow).
pub fn quantize(amount: Decimal) -> Result<Decimal, ZncProxyError> {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
    if rounded.abs() > max_magnitude() {
        return Err(ZncProxyError::Overflow);
    }
    Ok(rounded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn half_even_rounds_ties_to_even() {
        assert_eq!(quantize(dec!(10.005)).unwrap(), dec!(10.00));
        assert_eq!(quantize(dec!(10.015)).unwrap(), dec!(10.02));
    }

    #[test]
    fn referral_bonus_boundary_rounds_to_10() {
        // 10% of 100.01 = 10.001 -> half-even -> 10.00
        assert_eq!(quantize(dec!(10.001)).unwrap(), dec!(10.00));
    }

    #[test]
    fn overflow_rejected() {
        assert!(quantize(dec!(100000000.00)).is_err());
        assert!(quantize(dec!(99999999.99)).is_ok());
    }
}
