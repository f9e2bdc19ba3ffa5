use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

/// A monetary amount in minor currency units (cents).
///
/// All currency arithmetic in the engine happens on integer cents; the only
/// places fractions appear are rate application and pro-rata allocation, both
/// of which round half-up to the nearest cent at the point of computation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Major units only, e.g. `from_major(500)` is 500.00.
    #[inline]
    pub const fn from_major(major: i64) -> Self {
        Money(major * 100)
    }

    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Unit price times a line quantity.
    pub fn times(&self, quantity: i64) -> Money {
        Money(self.0 * quantity)
    }

    /// Applies a rate expressed in basis points (10% == 1000 bp), rounding
    /// half-up to the nearest cent.
    pub fn apply_rate_bp(&self, rate_bp: u32) -> Money {
        let raw = self.0 as i128 * rate_bp as i128;
        Money(((raw * 2 + 10_000) / 20_000) as i64)
    }

    /// Pro-rata allocation: `self * part / whole`, rounded half-up.
    /// Returns zero when `whole` is zero.
    pub fn pro_rata(&self, part: Money, whole: Money) -> Money {
        if whole.is_zero() {
            return Money::ZERO;
        }
        let raw = self.0 as i128 * part.0 as i128;
        let whole = whole.0 as i128;
        Money(((raw * 2 + whole) / (whole * 2)) as i64)
    }

    pub fn min(self, other: Money) -> Money {
        Money(self.0.min(other.0))
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}
