use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use minibank_core::{AccountId, DepositId, DomainError};
use minibank_ledger::{Account, Deposit, Transaction, TransferError, TransferPlan};
use std::sync::Arc;

/// What happens to records that reference an account when it is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferencePolicy {
    /// Remove the referencing records together with the account.
    Cascade,
    /// Refuse to delete the account while any referencing record exists.
    Protect,
}

/// Deletion semantics for each relation that points at an account.
///
/// Defaults: transfers cascade with either party, deposits protect their owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionPolicy {
    /// Applies to transactions where the account is sender or receiver.
    pub transaction_parties: ReferencePolicy,
    /// Applies to deposits owned by the account.
    pub deposit_owner: ReferencePolicy,
}

impl Default for DeletionPolicy {
    fn default() -> Self {
        Self {
            transaction_parties: ReferencePolicy::Cascade,
            deposit_owner: ReferencePolicy::Protect,
        }
    }
}

/// Records removed alongside an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeletionReport {
    pub transactions_removed: usize,
    pub deposits_removed: usize,
}

/// Store operation error.
///
/// These are **infrastructure errors** (missing records, uniqueness, referential
/// integrity, lock failures) as opposed to business-rule rejections.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("account {0} not found")]
    AccountNotFound(AccountId),

    #[error("deposit {0} not found")]
    DepositNotFound(DepositId),

    #[error("username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("account {account} is still referenced by {count} {relation}")]
    Protected {
        account: AccountId,
        relation: &'static str,
        count: usize,
    },

    /// The plan no longer holds against the stored sender (a concurrent
    /// commit moved its balance or same-day total since validation).
    #[error("transfer no longer valid: {0}")]
    Rejected(TransferError),

    #[error("refused to commit: {0}")]
    Invariant(String),

    #[error("store lock poisoned")]
    LockPoisoned,
}

impl From<DomainError> for StoreError {
    fn from(value: DomainError) -> Self {
        StoreError::Invariant(value.to_string())
    }
}

/// Persistence collaborator for accounts, transfers and deposits.
///
/// ## Atomicity
///
/// `commit_transfer` writes the sender, the receiver and the transaction
/// record as one unit: after it returns, either all three are visible or
/// none is. Every other write touches a single record.
///
/// ## Referential integrity
///
/// Records that reference accounts (transactions, deposits) can only be
/// saved while those accounts exist. Deleting an account applies the
/// store's [`DeletionPolicy`].
pub trait LedgerStore: Send + Sync {
    fn find_account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Insert an account, or update the profile fields of an existing one.
    ///
    /// Usernames are unique across accounts. An existing account keeps its
    /// stored balance; only `commit_transfer` moves balances.
    fn save_account(&self, account: Account) -> Result<(), StoreError>;

    /// All accounts, ordered by username.
    fn list_accounts(&self) -> Result<Vec<Account>, StoreError>;

    /// Store a transaction record as-is (no balance changes).
    fn save_transaction(&self, transaction: Transaction) -> Result<(), StoreError>;

    /// All transactions in the order they were stored.
    fn list_transactions(&self) -> Result<Vec<Transaction>, StoreError>;

    /// Transactions sent by `sender` whose creation date (UTC) is `day`.
    fn find_transactions_for_sender_on_day(
        &self,
        sender: AccountId,
        day: NaiveDate,
    ) -> Result<Vec<Transaction>, StoreError>;

    /// Apply a validated transfer: both balances plus the record, atomically.
    ///
    /// The balance and same-day cap rules are checked again against the
    /// stored sender inside the same critical section as the writes, so
    /// plans validated concurrently by different callers cannot overdraw
    /// the sender. A plan that no longer holds fails with
    /// [`StoreError::Rejected`].
    fn commit_transfer(&self, plan: TransferPlan) -> Result<Transaction, StoreError>;

    /// Insert or replace a deposit, refreshing its `last_saved_at` to `saved_at`.
    ///
    /// Returns the deposit as stored.
    fn save_deposit(&self, deposit: Deposit, saved_at: DateTime<Utc>) -> Result<Deposit, StoreError>;

    fn find_deposit(&self, id: DepositId) -> Result<Option<Deposit>, StoreError>;

    /// All deposits, oldest first.
    fn list_deposits(&self) -> Result<Vec<Deposit>, StoreError>;

    /// Delete an account, honouring the store's deletion policy.
    fn delete_account(&self, id: AccountId) -> Result<DeletionReport, StoreError>;
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn find_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        (**self).find_account(id)
    }

    fn save_account(&self, account: Account) -> Result<(), StoreError> {
        (**self).save_account(account)
    }

    fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        (**self).list_accounts()
    }

    fn save_transaction(&self, transaction: Transaction) -> Result<(), StoreError> {
        (**self).save_transaction(transaction)
    }

    fn list_transactions(&self) -> Result<Vec<Transaction>, StoreError> {
        (**self).list_transactions()
    }

    fn find_transactions_for_sender_on_day(
        &self,
        sender: AccountId,
        day: NaiveDate,
    ) -> Result<Vec<Transaction>, StoreError> {
        (**self).find_transactions_for_sender_on_day(sender, day)
    }

    fn commit_transfer(&self, plan: TransferPlan) -> Result<Transaction, StoreError> {
        (**self).commit_transfer(plan)
    }

    fn save_deposit(&self, deposit: Deposit, saved_at: DateTime<Utc>) -> Result<Deposit, StoreError> {
        (**self).save_deposit(deposit, saved_at)
    }

    fn find_deposit(&self, id: DepositId) -> Result<Option<Deposit>, StoreError> {
        (**self).find_deposit(id)
    }

    fn list_deposits(&self) -> Result<Vec<Deposit>, StoreError> {
        (**self).list_deposits()
    }

    fn delete_account(&self, id: AccountId) -> Result<DeletionReport, StoreError> {
        (**self).delete_account(id)
    }
}
