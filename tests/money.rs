use std::str::FromStr;

use rust_decimal::Decimal;
use storefront::money::Money;

#[test]
fn decimal_prices_round_half_away_from_zero() -> anyhow::Result<()> {
    assert_eq!(Money::from_decimal(Decimal::from_str("5.50")?), Money(550));
    assert_eq!(Money::from_decimal(Decimal::from_str("0.125")?), Money(13));
    assert_eq!(Money(2550).to_string(), "25.50");
    Ok(())
}

#[test]
fn overflow_is_reported_instead_of_wrapping() -> anyhow::Result<()> {
    let max_price = Money::from_decimal(Decimal::from_str("9999999999.99")?);

    assert_eq!(max_price.checked_times(i32::MAX), None);
    assert_eq!(max_price.checked_times(999), Some(Money(999_999_999_999 * 999)));
    assert_eq!(Money(i64::MAX).checked_add(Money(1)), None);
    assert_eq!(Money::checked_sum([Money(i64::MAX), Money(1)]), None);
    assert_eq!(Money::checked_sum([Money(2000), Money(550)]), Some(Money(2550)));
    assert_eq!(Money::checked_sum([]), Some(Money::ZERO));
    Ok(())
}
