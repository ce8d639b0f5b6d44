use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Decimal-exact monetary amount bound to a currency code.
///
/// Amounts stay unrounded through intermediate calculations; rounding to the
/// currency's minor unit happens only when a final total is taken via
/// [`Money::rounded`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: String,
}

impl Money {
    pub fn new(amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }

    pub fn zero(currency: impl Into<String>) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Add another amount of the same currency.
    pub fn try_add(&self, other: &Money) -> Result<Money> {
        if self.currency != other.currency {
            return Err(Error::InvalidArgument(format!(
                "currency mismatch: {} vs {}",
                self.currency, other.currency
            )));
        }
        Ok(Money::new(self.amount + other.amount, &self.currency))
    }

    pub fn mul(&self, factor: Decimal) -> Money {
        Money::new(self.amount * factor, &self.currency)
    }

    /// Round to the currency's minor unit (banker-unfriendly: half away from zero).
    pub fn rounded(&self) -> Money {
        let scale = minor_units(&self.currency);
        Money::new(
            self.amount
                .round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero),
            &self.currency,
        )
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.rounded().amount, self.currency)
    }
}

/// Minor-unit digits per ISO 4217 currency.
fn minor_units(currency: &str) -> u32 {
    match currency {
        "JPY" | "KRW" | "VND" => 0,
        "BHD" | "KWD" | "OMR" | "TND" => 3,
        _ => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rounding_at_minor_unit() {
        let m = Money::new(dec!(23.804999), "EUR");
        assert_eq!(m.rounded().amount(), dec!(23.80));

        let m = Money::new(dec!(23.805), "EUR");
        assert_eq!(m.rounded().amount(), dec!(23.81));

        let m = Money::new(dec!(1200.4), "JPY");
        assert_eq!(m.rounded().amount(), dec!(1200));
    }

    #[test]
    fn test_add_same_currency() {
        let a = Money::new(dec!(10.00), "EUR");
        let b = Money::new(dec!(3.80), "EUR");
        assert_eq!(a.try_add(&b).unwrap().amount(), dec!(13.80));
    }

    #[test]
    fn test_add_currency_mismatch() {
        let a = Money::new(dec!(10.00), "EUR");
        let b = Money::new(dec!(10.00), "USD");
        assert!(matches!(
            a.try_add(&b),
            Err(crate::error::Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_mul_is_exact() {
        let unit = Money::new(dec!(10.00), "EUR");
        assert_eq!(unit.mul(dec!(2)).amount(), dec!(20.00));
        // No binary float drift: 0.1 * 3 is exactly 0.3.
        let unit = Money::new(dec!(0.1), "EUR");
        assert_eq!(unit.mul(dec!(3)).amount(), dec!(0.3));
    }
}
