//! Money in integer minor units.
//!
//! Prices are carried in the currency's smallest denomination (cents), so
//! derived totals stay exact. Float drift never reaches a subtotal.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// An amount in minor units.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// The zero amount.
    pub const ZERO: Money = Money(0);

    /// Create an amount from minor units.
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// The amount in minor units.
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Check if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Multiply by a quantity, saturating at the representable bounds.
    pub fn times(&self, quantity: u64) -> Money {
        let quantity = i64::try_from(quantity).unwrap_or(i64::MAX);
        Money(self.0.saturating_mul(quantity))
    }

    /// Add another amount, saturating at the representable bounds.
    pub fn saturating_add(&self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        self.saturating_add(rhs)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = self.saturating_add(rhs);
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, amount| acc.saturating_add(amount))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_minor_round_trips() {
        let amount = Money::from_minor(2_500);
        assert_eq!(amount.minor(), 2_500);
        assert!(!amount.is_zero());
        assert!(Money::ZERO.is_zero());
    }

    #[test]
    fn test_times_scales_by_quantity() {
        assert_eq!(Money::from_minor(1_000).times(3), Money::from_minor(3_000));
        assert_eq!(Money::from_minor(999).times(0), Money::ZERO);
    }

    #[test]
    fn test_times_saturates_instead_of_overflowing() {
        let huge = Money::from_minor(i64::MAX);
        assert_eq!(huge.times(2), Money::from_minor(i64::MAX));
        assert_eq!(huge.times(u64::MAX), Money::from_minor(i64::MAX));
    }

    #[test]
    fn test_sum_folds_amounts() {
        let total: Money = [100, 250, 50].into_iter().map(Money::from_minor).sum();
        assert_eq!(total, Money::from_minor(400));
    }

    #[test]
    fn test_add_saturates() {
        let almost = Money::from_minor(i64::MAX - 1);
        assert_eq!(
            almost.saturating_add(Money::from_minor(100)),
            Money::from_minor(i64::MAX)
        );

        let mut amount = Money::from_minor(100);
        amount += Money::from_minor(50);
        assert_eq!(amount, Money::from_minor(150));
    }

    #[test]
    fn test_display_formats_major_and_minor() {
        assert_eq!(Money::from_minor(2_500).to_string(), "25.00");
        assert_eq!(Money::from_minor(5).to_string(), "0.05");
        assert_eq!(Money::from_minor(-150).to_string(), "-1.50");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }

    #[test]
    fn test_serializes_as_plain_number() {
        let json = serde_json::to_string(&Money::from_minor(2_500)).unwrap();
        assert_eq!(json, "2500");

        let parsed: Money = serde_json::from_str("2500").unwrap();
        assert_eq!(parsed, Money::from_minor(2_500));
    }
}
