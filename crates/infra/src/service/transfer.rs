use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use minibank_core::{AccountId, TransactionId};
use minibank_ledger::{Transaction, TransferLimits, TransferRequest, spent_on_day, validate};

use super::LedgerError;
use crate::store::{LedgerStore, StoreError};

/// A transaction with both parties resolved to usernames, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionView {
    pub id: TransactionId,
    pub sender: String,
    pub receiver: String,
    pub amount: u32,
    pub created: DateTime<Utc>,
}

impl core::fmt::Display for TransactionView {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} sent {} {} $", self.sender, self.receiver, self.amount)
    }
}

/// Executes transfers against a store.
///
/// Validation here works on a snapshot; the store repeats the balance and
/// daily-cap checks under its commit lock. Any number of services may share
/// one store.
#[derive(Debug)]
pub struct TransferService<S> {
    store: S,
    limits: TransferLimits,
}

impl<S> TransferService<S> {
    pub fn new(store: S, limits: TransferLimits) -> Self {
        Self { store, limits }
    }

    pub fn limits(&self) -> &TransferLimits {
        &self.limits
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> TransferService<S>
where
    S: LedgerStore,
{
    /// Move `amount` from `sender` to `receiver` at business time `as_of`.
    ///
    /// On success both balances and the new record are committed together.
    /// On any error nothing is written.
    pub fn attempt_transfer(
        &self,
        sender: AccountId,
        receiver: AccountId,
        amount: u32,
        as_of: DateTime<Utc>,
    ) -> Result<Transaction, LedgerError> {
        let sender_account = self
            .store
            .find_account(sender)?
            .ok_or(StoreError::AccountNotFound(sender))?;
        if self.store.find_account(receiver)?.is_none() {
            return Err(StoreError::AccountNotFound(receiver).into());
        }

        let day = as_of.date_naive();
        let history = self.store.find_transactions_for_sender_on_day(sender, day)?;
        let spent_today = spent_on_day(&history, sender, day);

        let request = TransferRequest::new(sender, receiver, amount, as_of);
        let plan = match validate(&request, &sender_account, spent_today, &self.limits) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!(
                    sender = %sender,
                    receiver = %receiver,
                    amount,
                    "transfer rejected: {e}"
                );
                return Err(e.into());
            }
        };

        let transaction = match self.store.commit_transfer(plan) {
            Ok(transaction) => transaction,
            Err(StoreError::Rejected(e)) => {
                tracing::warn!(
                    sender = %sender,
                    receiver = %receiver,
                    amount,
                    "transfer rejected at commit: {e}"
                );
                return Err(e.into());
            }
            Err(e) => {
                tracing::error!(sender = %sender, receiver = %receiver, amount, "transfer commit failed: {e}");
                return Err(e.into());
            }
        };

        tracing::info!(
            transaction = %transaction.id_typed(),
            sender = %sender,
            receiver = %receiver,
            amount,
            spent_today = spent_today + u64::from(amount),
            "transfer committed"
        );

        Ok(transaction)
    }

    /// Every stored transaction with usernames resolved.
    pub fn history(&self) -> Result<Vec<TransactionView>, LedgerError> {
        let names: HashMap<AccountId, String> = self
            .store
            .list_accounts()?
            .into_iter()
            .map(|a| (a.id_typed(), a.username().to_string()))
            .collect();

        let name_of = |id: AccountId| {
            names
                .get(&id)
                .cloned()
                .ok_or(LedgerError::Store(StoreError::AccountNotFound(id)))
        };

        self.store
            .list_transactions()?
            .into_iter()
            .map(|t| -> Result<TransactionView, LedgerError> {
                Ok(TransactionView {
                    id: t.id_typed(),
                    sender: name_of(t.sender())?,
                    receiver: name_of(t.receiver())?,
                    amount: t.amount(),
                    created: t.created(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use minibank_ledger::{Account, TransferError};
    use proptest::prelude::*;

    use crate::store::InMemoryLedgerStore;

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    fn setup(sender_balance: i64) -> (TransferService<InMemoryLedgerStore>, AccountId, AccountId) {
        let store = InMemoryLedgerStore::new();
        let aida = Account::new(AccountId::new(), "aida", "+77010000001", sender_balance);
        let bolat = Account::new(AccountId::new(), "bolat", "+77010000002", 100);
        let (a, b) = (aida.id_typed(), bolat.id_typed());
        store.save_account(aida).unwrap();
        store.save_account(bolat).unwrap();
        (TransferService::new(store, TransferLimits::default()), a, b)
    }

    fn balance(service: &TransferService<InMemoryLedgerStore>, id: AccountId) -> i64 {
        service.store().find_account(id).unwrap().unwrap().balance()
    }

    #[test]
    fn transfer_commits_balances_and_record() {
        let (service, aida, bolat) = setup(1_000);

        let tx = service.attempt_transfer(aida, bolat, 300, test_time()).unwrap();

        assert_eq!(balance(&service, aida), 700);
        assert_eq!(balance(&service, bolat), 400);
        assert_eq!(service.store().list_transactions().unwrap(), vec![tx.clone()]);
        assert_eq!(tx.created(), test_time());
    }

    #[test]
    fn rejection_leaves_everything_untouched() {
        let (service, aida, bolat) = setup(200);

        let err = service.attempt_transfer(aida, bolat, 300, test_time()).unwrap_err();

        assert_eq!(err, LedgerError::Transfer(TransferError::InsufficientFunds { shortfall: 100 }));
        assert!(err.is_rejection());
        assert_eq!(balance(&service, aida), 200);
        assert_eq!(balance(&service, bolat), 100);
        assert!(service.store().list_transactions().unwrap().is_empty());
    }

    #[test]
    fn self_transfer_is_refused() {
        let (service, aida, _) = setup(10_000);
        let err = service.attempt_transfer(aida, aida, 300, test_time()).unwrap_err();
        assert_eq!(err, LedgerError::Transfer(TransferError::SelfTransfer));
        assert_eq!(balance(&service, aida), 10_000);
    }

    #[test]
    fn unknown_accounts_are_faults_not_rejections() {
        let (service, aida, _) = setup(10_000);
        let ghost = AccountId::new();

        let err = service.attempt_transfer(aida, ghost, 300, test_time()).unwrap_err();
        assert_eq!(err, LedgerError::Store(StoreError::AccountNotFound(ghost)));
        assert!(!err.is_rejection());

        let err = service.attempt_transfer(ghost, aida, 300, test_time()).unwrap_err();
        assert_eq!(err, LedgerError::Store(StoreError::AccountNotFound(ghost)));
    }

    #[test]
    fn daily_cap_counts_only_the_same_day() {
        let (service, aida, bolat) = setup(1_000_000);

        for _ in 0..5 {
            service.attempt_transfer(aida, bolat, 100_000, test_time()).unwrap();
        }
        let err = service.attempt_transfer(aida, bolat, 100, test_time()).unwrap_err();
        assert_eq!(
            err,
            LedgerError::Transfer(TransferError::DailyCapExceeded { cap: 500_000, remaining: 0 })
        );

        let tomorrow = test_time() + Duration::days(1);
        service.attempt_transfer(aida, bolat, 100, tomorrow).unwrap();
        assert_eq!(balance(&service, aida), 1_000_000 - 500_100);
    }

    #[test]
    fn history_reads_like_a_statement() {
        let (service, aida, bolat) = setup(1_000);
        service.attempt_transfer(aida, bolat, 250, test_time()).unwrap();

        let history = service.history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].to_string(), "aida sent bolat 250 $");
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        #[test]
        fn transfer_sequences_conserve_money(
            steps in proptest::collection::vec((0usize..3, 0usize..3, 0u32..3_000), 1..40)
        ) {
            let store = InMemoryLedgerStore::new();
            let mut ids = Vec::new();
            for (name, opening) in [("aida", 5_000), ("bolat", 1_000), ("dana", 0)] {
                let account = Account::new(AccountId::new(), name, "", opening);
                ids.push(account.id_typed());
                store.save_account(account).unwrap();
            }
            let service = TransferService::new(store, TransferLimits::default());

            let mut accepted = 0;
            for (from, to, amount) in steps {
                match service.attempt_transfer(ids[from], ids[to], amount, test_time()) {
                    Ok(_) => accepted += 1,
                    Err(e) => prop_assert!(e.is_rejection(), "unexpected fault: {e}"),
                }
            }

            let balances: Vec<i64> = ids.iter().map(|id| balance(&service, *id)).collect();
            prop_assert_eq!(balances.iter().sum::<i64>(), 6_000);
            prop_assert!(balances.iter().all(|b| *b >= 0));
            prop_assert_eq!(service.store().list_transactions().unwrap().len(), accepted);
        }
    }
}
