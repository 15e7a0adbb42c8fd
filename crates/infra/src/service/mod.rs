//! Application services: load, decide, persist.
//!
//! ```text
//! request
//!   ↓
//! 1. Load the records involved from the store
//!   ↓
//! 2. Decide (pure rules from `minibank-ledger`)
//!   ↓
//! 3. Commit through the store in one write (the store re-checks the
//!    balance and daily-cap rules under its lock)
//! ```
//!
//! Services hold no domain state of their own; they compose a [`LedgerStore`]
//! with the configured rules.
//!
//! [`LedgerStore`]: crate::store::LedgerStore

pub mod deposit;
pub mod transfer;

pub use deposit::{DepositService, DepositView};
pub use transfer::{TransactionView, TransferService};

use thiserror::Error;

use minibank_ledger::{DepositError, TransferError};

use crate::store::StoreError;

/// Error surfaced by the ledger services.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The transfer was refused by a business rule.
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// The deposit was refused by a business rule.
    #[error(transparent)]
    Deposit(#[from] DepositError),

    /// The store could not complete the operation.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Whether this is an expected business rejection rather than a fault.
    pub fn is_rejection(&self) -> bool {
        matches!(self, LedgerError::Transfer(_) | LedgerError::Deposit(_))
    }
}
