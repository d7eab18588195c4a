//! The module contains the error the engine can throw.
//!
//! The settlement-specific errors are:
//!
//! - [`ReceiptAlreadySettled`] thrown when a [`Receipt`] has already been
//!   fully applied and a new settlement is attempted against it.
//! - [`NoOutstandingBalance`] thrown when automatic allocation finds nothing
//!   to pay for a payee.
//! - [`Conflict`] thrown when a concurrent writer changed a row between the
//!   read and the guarded write. The call had no effect and can be retried.
//!
//!  [`ReceiptAlreadySettled`]: EngineError::ReceiptAlreadySettled
//!  [`NoOutstandingBalance`]: EngineError::NoOutstandingBalance
//!  [`Conflict`]: EngineError::Conflict
//!  [`Receipt`]: super::receipts::Receipt
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Receipt already settled: {0}")]
    ReceiptAlreadySettled(String),
    #[error("Receipt not confirmed: {0}")]
    ReceiptNotConfirmed(String),
    #[error("No outstanding obligations for payee \"{0}\"")]
    NoOutstandingBalance(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid weight: {0}")]
    InvalidWeight(String),
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("Invalid status: {0}")]
    InvalidStatus(String),
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
    #[error("Concurrent update detected: {0}")]
    Conflict(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ReceiptAlreadySettled(a), Self::ReceiptAlreadySettled(b)) => a == b,
            (Self::ReceiptNotConfirmed(a), Self::ReceiptNotConfirmed(b)) => a == b,
            (Self::NoOutstandingBalance(a), Self::NoOutstandingBalance(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidWeight(a), Self::InvalidWeight(b)) => a == b,
            (Self::InvalidName(a), Self::InvalidName(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::InvalidStatus(a), Self::InvalidStatus(b)) => a == b,
            (Self::InvalidFilter(a), Self::InvalidFilter(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
