use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use minibank_core::{AccountId, DomainError, DomainResult, Entity, TransactionId};

use crate::account::Account;
use crate::error::TransferError;

/// Bounds applied to every transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferLimits {
    /// Smallest accepted amount (inclusive).
    pub min_amount: u32,
    /// Largest accepted amount (inclusive).
    pub max_amount: u32,
    /// Largest total a sender may move within one calendar day (inclusive).
    pub daily_cap: u64,
}

impl TransferLimits {
    pub const DEFAULT_MIN_AMOUNT: u32 = 100;
    pub const DEFAULT_MAX_AMOUNT: u32 = 100_000;
    pub const DEFAULT_DAILY_CAP: u64 = 500_000;

    pub fn new(min_amount: u32, max_amount: u32, daily_cap: u64) -> DomainResult<Self> {
        let limits = Self {
            min_amount,
            max_amount,
            daily_cap,
        };
        limits.check()?;
        Ok(limits)
    }

    /// Reject settings under which no transfer could ever pass.
    pub fn check(&self) -> DomainResult<()> {
        if self.min_amount == 0 {
            return Err(DomainError::validation("minimum transfer amount must be positive"));
        }
        if self.min_amount > self.max_amount {
            return Err(DomainError::validation(format!(
                "minimum transfer amount {} exceeds maximum {}",
                self.min_amount, self.max_amount
            )));
        }
        if self.daily_cap < u64::from(self.min_amount) {
            return Err(DomainError::validation(format!(
                "daily cap {} is below the minimum transfer amount {}",
                self.daily_cap, self.min_amount
            )));
        }
        Ok(())
    }
}

impl Default for TransferLimits {
    fn default() -> Self {
        Self {
            min_amount: Self::DEFAULT_MIN_AMOUNT,
            max_amount: Self::DEFAULT_MAX_AMOUNT,
            daily_cap: Self::DEFAULT_DAILY_CAP,
        }
    }
}

/// A proposed movement of `amount` from `sender` to `receiver`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub sender: AccountId,
    pub receiver: AccountId,
    pub amount: u32,
    /// Business time of the attempt; becomes the record's creation timestamp.
    pub as_of: DateTime<Utc>,
}

impl TransferRequest {
    pub fn new(sender: AccountId, receiver: AccountId, amount: u32, as_of: DateTime<Utc>) -> Self {
        Self {
            sender,
            receiver,
            amount,
            as_of,
        }
    }
}

/// A completed transfer (immutable once created).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    id: TransactionId,
    sender: AccountId,
    receiver: AccountId,
    amount: u32,
    created: DateTime<Utc>,
}

impl Transaction {
    /// Build a record directly, e.g. when importing history.
    ///
    /// This does not touch any balance; live transfers go through [`validate`].
    pub fn new(
        id: TransactionId,
        sender: AccountId,
        receiver: AccountId,
        amount: u32,
        created: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            sender,
            receiver,
            amount,
            created,
        }
    }

    pub fn id_typed(&self) -> TransactionId {
        self.id
    }

    pub fn sender(&self) -> AccountId {
        self.sender
    }

    pub fn receiver(&self) -> AccountId {
        self.receiver
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// Whether the account took part in this transfer on either side.
    pub fn involves(&self, account: AccountId) -> bool {
        self.sender == account || self.receiver == account
    }
}

impl Entity for Transaction {
    type Id = TransactionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Sum of everything `sender` sent on `day`.
///
/// Days are compared on the stored UTC timestamp (year, month, day).
pub fn spent_on_day<'a>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
    sender: AccountId,
    day: NaiveDate,
) -> u64 {
    transactions
        .into_iter()
        .filter(|t| t.sender == sender && t.created.date_naive() == day)
        .map(|t| u64::from(t.amount))
        .sum()
}

/// A transfer that passed every rule and is ready to be committed.
///
/// Only [`validate`] produces plans, so balances can only move through
/// requests that were checked. A plan keeps the limits it was checked
/// against so the committer can re-run the rules on the state it is about
/// to write over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    transaction: Transaction,
    limits: TransferLimits,
}

impl TransferPlan {
    /// The record that committing this plan will create.
    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    /// Re-run every rule against the sender as it is now.
    ///
    /// `spent_today` is the sender's current total for the day of the record.
    pub fn recheck(&self, sender: &Account, spent_today: u64) -> Result<(), TransferError> {
        let request = TransferRequest::new(
            self.transaction.sender,
            self.transaction.receiver,
            self.transaction.amount,
            self.transaction.created,
        );
        check_rules(&request, sender, spent_today, &self.limits)
    }

    /// Apply both balance changes and hand back the record.
    ///
    /// The caller must persist both accounts and the record as one unit.
    pub fn commit_to(self, sender: &mut Account, receiver: &mut Account) -> DomainResult<Transaction> {
        if sender.id_typed() != self.transaction.sender
            || receiver.id_typed() != self.transaction.receiver
        {
            return Err(DomainError::invariant(
                "transfer plan applied to accounts it was not validated for",
            ));
        }
        if receiver.balance().checked_add(i64::from(self.transaction.amount)).is_none() {
            return Err(DomainError::invariant("receiver balance would overflow"));
        }

        sender.debit(self.transaction.amount);
        receiver.credit(self.transaction.amount);
        Ok(self.transaction)
    }
}

/// Decide whether `request` may go through.
///
/// `sender` must be the account named by `request.sender`, and `spent_today`
/// the sender's total for the calendar day of `request.as_of` (see
/// [`spent_on_day`]). Rules are checked in a fixed order and the first
/// failure wins:
///
/// 1. balance covers the amount
/// 2. sender and receiver differ
/// 3. amount is at least the minimum
/// 4. amount is at most the maximum
/// 5. same-day total including this amount stays within the daily cap
pub fn validate(
    request: &TransferRequest,
    sender: &Account,
    spent_today: u64,
    limits: &TransferLimits,
) -> Result<TransferPlan, TransferError> {
    check_rules(request, sender, spent_today, limits)?;

    Ok(TransferPlan {
        transaction: Transaction {
            id: TransactionId::new(),
            sender: request.sender,
            receiver: request.receiver,
            amount: request.amount,
            created: request.as_of,
        },
        limits: *limits,
    })
}

fn check_rules(
    request: &TransferRequest,
    sender: &Account,
    spent_today: u64,
    limits: &TransferLimits,
) -> Result<(), TransferError> {
    let amount = i64::from(request.amount);
    if sender.balance() < amount {
        return Err(TransferError::InsufficientFunds {
            shortfall: amount.saturating_sub(sender.balance()),
        });
    }

    if request.sender == request.receiver {
        return Err(TransferError::SelfTransfer);
    }

    if request.amount < limits.min_amount {
        return Err(TransferError::AmountBelowMinimum {
            minimum: limits.min_amount,
        });
    }

    if request.amount > limits.max_amount {
        return Err(TransferError::AmountAboveMaximum {
            maximum: limits.max_amount,
        });
    }

    if spent_today.saturating_add(u64::from(request.amount)) > limits.daily_cap {
        return Err(TransferError::DailyCapExceeded {
            cap: limits.daily_cap,
            remaining: limits.daily_cap.saturating_sub(spent_today),
        });
    }

    Ok(())
}
