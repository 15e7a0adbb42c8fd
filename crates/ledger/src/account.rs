use serde::{Deserialize, Serialize};

use minibank_core::{AccountId, Entity};

/// A user account holding an integer balance.
///
/// Accounts are created externally (administration, onboarding) with an
/// opening balance. After that the balance only moves through accepted
/// transfers, see [`crate::TransferPlan::commit_to`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    id: AccountId,
    username: String,
    email: Option<String>,
    balance: i64,
    phone: String,
}

impl Account {
    pub fn new(
        id: AccountId,
        username: impl Into<String>,
        phone: impl Into<String>,
        opening_balance: i64,
    ) -> Self {
        Self {
            id,
            username: username.into(),
            email: None,
            balance: opening_balance,
            phone: phone.into(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn id_typed(&self) -> AccountId {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    /// Profile fields from `self`, balance from `stored`.
    ///
    /// Used when an existing account is saved again: the balance is owned by
    /// the transfer commit and never taken from the incoming copy.
    pub fn keeping_balance_of(mut self, stored: &Account) -> Self {
        self.balance = stored.balance;
        self
    }

    pub(crate) fn debit(&mut self, amount: u32) {
        self.balance -= i64::from(amount);
    }

    pub(crate) fn credit(&mut self, amount: u32) {
        self.balance += i64::from(amount);
    }
}

impl Entity for Account {
    type Id = AccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl core::fmt::Display for Account {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}, balance {}", self.username, self.balance)
    }
}
