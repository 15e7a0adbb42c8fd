//! Business-rule rejections.
//!
//! These are expected, recoverable outcomes, not faults. A rejection is final
//! for the request that produced it; retrying means submitting a new request.

use rust_decimal::Decimal;
use thiserror::Error;

/// Why a transfer was refused. Only the first failing rule is reported.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// The sender's balance is lower than the amount.
    #[error("insufficient funds: the sender is short by {shortfall}")]
    InsufficientFunds { shortfall: i64 },

    #[error("cannot send money to yourself")]
    SelfTransfer,

    #[error("amount cannot be less than {minimum}")]
    AmountBelowMinimum { minimum: u32 },

    #[error("amount cannot be greater than {maximum}")]
    AmountAboveMaximum { maximum: u32 },

    /// The sender's same-day total would go over the cap.
    #[error("cannot send more than {cap} per day; remaining allowance is {remaining}")]
    DailyCapExceeded { cap: u64, remaining: u64 },
}

/// Why a deposit could not be opened.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DepositError {
    #[error("minimum deposit is {minimum}")]
    PrincipalBelowMinimum { minimum: Decimal },

    /// More than one fractional digit, or more digits than the principal can hold.
    #[error("principal {principal} does not fit {max} with one decimal place")]
    PrincipalOutOfRange { principal: Decimal, max: Decimal },
}
