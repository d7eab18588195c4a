//! Net weights from weighbridge tickets.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{EngineError, Money, ResultEngine, money::parse_fixed_point};

const MILLI_PER_TON: i128 = 1000;

/// A weight in **thousandths of a ton** (kilograms), the precision the
/// weighbridge prints.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(into = "String", try_from = "String")]
#[repr(transparent)]
pub struct Weight(i64);

impl Weight {
    pub const ZERO: Weight = Weight(0);

    #[must_use]
    pub const fn from_milli(milli: i64) -> Self {
        Self(milli)
    }

    #[must_use]
    pub const fn milli(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }
}

/// Payable for a shipment: `unit_price` (per ton) × `net_weight`, rounded to
/// the minor unit with round-half-up.
///
/// ```rust
/// use engine::{Money, Weight, payable_amount};
///
/// // 512.35/t × 3.333 t = 1707.66255 → 1707.66
/// let price = Money::new(512_35);
/// let weight = Weight::from_milli(3_333);
/// assert_eq!(payable_amount(price, weight).unwrap(), Money::new(1707_66));
/// ```
pub fn payable_amount(unit_price: Money, net_weight: Weight) -> ResultEngine<Money> {
    if unit_price.is_negative() {
        return Err(EngineError::InvalidAmount(
            "unit price must be >= 0".to_string(),
        ));
    }
    if net_weight.is_negative() {
        return Err(EngineError::InvalidWeight(
            "net weight must be >= 0".to_string(),
        ));
    }

    let scaled = i128::from(unit_price.minor()) * i128::from(net_weight.milli());
    let rounded = (scaled + MILLI_PER_TON / 2) / MILLI_PER_TON;
    i64::try_from(rounded)
        .map(Money::new)
        .map_err(|_| EngineError::InvalidAmount("payable amount too large".to_string()))
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:03}", abs / 1000, abs % 1000)
    }
}

impl From<Weight> for String {
    fn from(value: Weight) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for Weight {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for Weight {
    type Err = EngineError;

    /// Parses tons with at most three decimals (`"32.48"`, `"32,480"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_fixed_point(s, 3)
            .map(Weight)
            .map_err(|err| EngineError::InvalidWeight(err.describe().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tons() {
        assert_eq!("32.48".parse::<Weight>().unwrap().milli(), 32_480);
        assert_eq!("7".parse::<Weight>().unwrap().milli(), 7_000);
        assert_eq!("0,005".parse::<Weight>().unwrap().milli(), 5);
        assert!("1.0005".parse::<Weight>().is_err());
        assert_eq!(Weight::from_milli(32_480).to_string(), "32.480");
    }

    #[test]
    fn payable_is_exact_for_whole_cents() {
        let payable = payable_amount(Money::new(500_00), Weight::from_milli(10_000)).unwrap();
        assert_eq!(payable, Money::new(5000_00));
    }

    #[test]
    fn payable_rounds_half_up() {
        // 0.01 × 0.500 t = 0.005 → 0.01
        assert_eq!(
            payable_amount(Money::new(1), Weight::from_milli(500)).unwrap(),
            Money::new(1)
        );
        // 0.01 × 0.499 t = 0.00499 → 0.00
        assert_eq!(
            payable_amount(Money::new(1), Weight::from_milli(499)).unwrap(),
            Money::ZERO
        );
    }

    #[test]
    fn payable_rejects_negative_inputs() {
        assert!(payable_amount(Money::new(-1), Weight::from_milli(1)).is_err());
        assert!(payable_amount(Money::new(1), Weight::from_milli(-1)).is_err());
    }
}
