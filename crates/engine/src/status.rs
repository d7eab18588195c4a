//! Status state machines for obligations and receipts.

use serde::{Deserialize, Serialize};

use crate::{EngineError, Money};

/// Payment state of an obligation.
///
/// Never set directly: always derived from `payable` and `paid` with
/// [`ObligationStatus::derive`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObligationStatus {
    Pending,
    Partial,
    Settled,
}

impl ObligationStatus {
    /// Derives the status from the amounts.
    ///
    /// ```rust
    /// use engine::{Money, ObligationStatus};
    ///
    /// let payable = Money::new(5000_00);
    /// assert_eq!(ObligationStatus::derive(payable, Money::ZERO), ObligationStatus::Pending);
    /// assert_eq!(ObligationStatus::derive(payable, Money::new(1)), ObligationStatus::Partial);
    /// assert_eq!(ObligationStatus::derive(payable, payable), ObligationStatus::Settled);
    /// ```
    #[must_use]
    pub fn derive(payable: Money, paid: Money) -> Self {
        if !paid.is_positive() {
            Self::Pending
        } else if paid >= payable {
            Self::Settled
        } else {
            Self::Partial
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Partial => "partial",
            Self::Settled => "settled",
        }
    }
}

impl TryFrom<&str> for ObligationStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "partial" => Ok(Self::Partial),
            "settled" => Ok(Self::Settled),
            other => Err(EngineError::InvalidStatus(format!(
                "invalid obligation status: {other}"
            ))),
        }
    }
}

/// Lifecycle of a payment receipt.
///
/// `PendingConfirmation` → `Confirmed` (human review) → `Settled` (value
/// fully applied). A settled receipt accepts no further settlement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    PendingConfirmation,
    Confirmed,
    Settled,
}

impl ReceiptStatus {
    /// Initial status for a new receipt: typed in by a human means already
    /// reviewed.
    #[must_use]
    pub fn initial(is_manual: bool) -> Self {
        if is_manual {
            Self::Confirmed
        } else {
            Self::PendingConfirmation
        }
    }

    /// Status after a settlement call, given everything applied from the
    /// receipt so far.
    #[must_use]
    pub fn after_settlement(face_value: Money, applied: Money) -> Self {
        if applied >= face_value {
            Self::Settled
        } else {
            Self::Confirmed
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingConfirmation => "pending_confirmation",
            Self::Confirmed => "confirmed",
            Self::Settled => "settled",
        }
    }
}

impl TryFrom<&str> for ReceiptStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending_confirmation" => Ok(Self::PendingConfirmation),
            "confirmed" => Ok(Self::Confirmed),
            "settled" => Ok(Self::Settled),
            other => Err(EngineError::InvalidStatus(format!(
                "invalid receipt status: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn obligation_status_boundaries() {
        let payable = Money::new(100);
        assert_eq!(
            ObligationStatus::derive(payable, Money::new(-5)),
            ObligationStatus::Pending
        );
        assert_eq!(
            ObligationStatus::derive(payable, Money::ZERO),
            ObligationStatus::Pending
        );
        assert_eq!(
            ObligationStatus::derive(payable, Money::new(99)),
            ObligationStatus::Partial
        );
        assert_eq!(
            ObligationStatus::derive(payable, Money::new(100)),
            ObligationStatus::Settled
        );
    }

    #[test]
    fn zero_payable_obligation_is_pending_until_paid() {
        assert_eq!(
            ObligationStatus::derive(Money::ZERO, Money::ZERO),
            ObligationStatus::Pending
        );
    }

    #[test]
    fn receipt_status_after_settlement() {
        let face = Money::new(2500_00);
        assert_eq!(
            ReceiptStatus::after_settlement(face, Money::new(2500_00)),
            ReceiptStatus::Settled
        );
        assert_eq!(
            ReceiptStatus::after_settlement(face, Money::new(2000_00)),
            ReceiptStatus::Confirmed
        );
    }

    #[test]
    fn statuses_round_trip_through_storage_names() {
        for status in [
            ObligationStatus::Pending,
            ObligationStatus::Partial,
            ObligationStatus::Settled,
        ] {
            assert_eq!(ObligationStatus::try_from(status.as_str()).unwrap(), status);
        }
        assert!(ReceiptStatus::try_from("verified").is_err());
        assert_eq!(ReceiptStatus::initial(true), ReceiptStatus::Confirmed);
        assert_eq!(
            ReceiptStatus::initial(false),
            ReceiptStatus::PendingConfirmation
        );
    }
}
