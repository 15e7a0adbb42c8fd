//! Ledger module (accounts, peer-to-peer transfers, interest-bearing deposits).
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns. Every rule
//! takes its reference time as an argument so decisions are deterministic.

pub mod account;
pub mod deposit;
pub mod error;
pub mod transfer;

pub use account::Account;
pub use deposit::{AccrualBasis, Deposit, DepositPolicy, current_value, validate_principal};
pub use error::{DepositError, TransferError};
pub use transfer::{
    Transaction, TransferLimits, TransferPlan, TransferRequest, spent_on_day, validate,
};
