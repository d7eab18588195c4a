use std::{
    fmt,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Signed money amount represented as **integer minor units** (fen/cents).
///
/// Use this type for **all** monetary values in the engine (payable, paid,
/// balance, receipt face values, settled amounts) to avoid floating-point
/// drift.
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount = Money::new(12_34);
/// assert_eq!(amount.minor(), 1234);
/// assert_eq!(amount.to_string(), "12.34");
/// ```
///
/// Parsing from user input (accepts `.` or `,` as decimal separator; rejects >
/// 2 decimals):
///
/// ```rust
/// use engine::Money;
///
/// assert_eq!("10".parse::<Money>().unwrap().minor(), 1000);
/// assert_eq!("10,5".parse::<Money>().unwrap().minor(), 1050);
/// assert!("12.345".parse::<Money>().is_err());
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(into = "String", try_from = "String")]
#[repr(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates a new amount from integer minor units.
    #[must_use]
    pub const fn new(minor: i64) -> Self {
        Self(minor)
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = abs / 100;
        let minor = abs % 100;
        write!(f, "{sign}{units}.{minor:02}")
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl From<Money> for String {
    fn from(value: Money) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for Money {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
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

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

/// Why a fixed-point decimal string was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FixedPointError {
    Empty,
    Invalid,
    TooManyDecimals,
    Overflow,
}

impl FixedPointError {
    pub(crate) fn describe(self) -> &'static str {
        match self {
            Self::Empty => "empty value",
            Self::Invalid => "invalid value",
            Self::TooManyDecimals => "too many decimals",
            Self::Overflow => "value too large",
        }
    }
}

/// Parses a decimal string into an integer scaled by `10^scale`.
///
/// Accepts `.` or `,` as decimal separator and an optional leading `+`/`-`.
/// Never goes through floating point.
pub(crate) fn parse_fixed_point(input: &str, scale: u32) -> Result<i64, FixedPointError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(FixedPointError::Empty);
    }

    let (negative, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
        (true, stripped)
    } else if let Some(stripped) = trimmed.strip_prefix('+') {
        (false, stripped)
    } else {
        (false, trimmed)
    };

    let rest = rest.trim();
    if rest.is_empty() {
        return Err(FixedPointError::Empty);
    }

    let rest = rest.replace(',', ".");
    let mut parts = rest.split('.');
    let whole_str = parts.next().ok_or(FixedPointError::Invalid)?;
    let frac_str = parts.next().unwrap_or("");
    if parts.next().is_some() {
        return Err(FixedPointError::Invalid);
    }

    if whole_str.is_empty() || !whole_str.chars().all(|c| c.is_ascii_digit()) {
        return Err(FixedPointError::Invalid);
    }
    if !frac_str.chars().all(|c| c.is_ascii_digit()) {
        return Err(FixedPointError::Invalid);
    }
    if frac_str.len() > scale as usize {
        return Err(FixedPointError::TooManyDecimals);
    }

    let whole: i64 = whole_str.parse().map_err(|_| FixedPointError::Overflow)?;
    let frac: i64 = if frac_str.is_empty() {
        0
    } else {
        let padding = scale - frac_str.len() as u32;
        frac_str
            .parse::<i64>()
            .map_err(|_| FixedPointError::Invalid)?
            * 10_i64.pow(padding)
    };

    let total = whole
        .checked_mul(10_i64.pow(scale))
        .and_then(|v| v.checked_add(frac))
        .ok_or(FixedPointError::Overflow)?;

    if negative {
        total.checked_neg().ok_or(FixedPointError::Overflow)
    } else {
        Ok(total)
    }
}

impl FromStr for Money {
    type Err = EngineError;

    /// Parses a decimal string into minor units (max 2 fractional digits).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_fixed_point(s, 2)
            .map(Money)
            .map_err(|err| EngineError::InvalidAmount(err.describe().to_string()))
    }
}
