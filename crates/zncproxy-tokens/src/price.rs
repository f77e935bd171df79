use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Fixed duration/price table (spec.md §4.2). Out-of-table durations fail
/// with `InvalidDuration` — the table is static; extending it is a code
/// change, same stance as the Scope Policy pattern table (spec.md §4.6).
const PRICE_TABLE: &[(i32, Decimal)] = &[
    (1, dec!(1.00)),
    (12, dec!(10.00)),
    (24, dec!(18.00)),
    (168, dec!(100.00)),
    (720, dec!(300.00)),
];

pub fn price_for(duration_hours: i32) -> Option<Decimal> {
    PRICE_TABLE
        .iter()
        .find(|(h, _)| *h == duration_hours)
        .map(|(_, p)| *p)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_durations_have_fixed_prices() {
        assert_eq!(price_for(1), Some(dec!(1.00)));
        assert_eq!(price_for(720), Some(dec!(300.00)));
    }

    #[test]
    fn unknown_duration_has_no_price() {
        assert_eq!(price_for(2), None);
    }
}
