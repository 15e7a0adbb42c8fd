use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, NaiveDate, Utc};

use minibank_core::{AccountId, DepositId, Entity};
use minibank_ledger::{Account, Deposit, Transaction, TransferPlan, spent_on_day};

use super::r#trait::{DeletionPolicy, DeletionReport, LedgerStore, ReferencePolicy, StoreError};

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<AccountId, Account>,
    transactions: Vec<Transaction>,
    deposits: HashMap<DepositId, Deposit>,
}

/// In-memory ledger store.
///
/// Intended for tests/dev. A single lock guards all tables, so every write
/// (including the three-record transfer commit and its final rule check) is
/// atomic.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    state: RwLock<State>,
    deletion: DeletionPolicy,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deletion_policy(deletion: DeletionPolicy) -> Self {
        Self {
            state: RwLock::new(State::default()),
            deletion,
        }
    }

    pub fn deletion_policy(&self) -> DeletionPolicy {
        self.deletion
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state.write().map_err(|_| StoreError::LockPoisoned)
    }

    fn require_account(state: &State, id: AccountId) -> Result<(), StoreError> {
        if state.accounts.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::AccountNotFound(id))
        }
    }
}

fn upsert<E: Entity>(table: &mut HashMap<E::Id, E>, record: E) {
    table.insert(record.id().clone(), record);
}

impl LedgerStore for InMemoryLedgerStore {
    fn find_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.read()?.accounts.get(&id).cloned())
    }

    fn save_account(&self, account: Account) -> Result<(), StoreError> {
        let mut state = self.write()?;

        let taken = state
            .accounts
            .values()
            .any(|a| a.username() == account.username() && a.id_typed() != account.id_typed());
        if taken {
            return Err(StoreError::UsernameTaken(account.username().to_string()));
        }

        let account = match state.accounts.get(account.id()) {
            Some(stored) => account.keeping_balance_of(stored),
            None => account,
        };
        upsert(&mut state.accounts, account);
        Ok(())
    }

    fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let state = self.read()?;
        let mut accounts: Vec<Account> = state.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| a.username().cmp(b.username()));
        Ok(accounts)
    }

    fn save_transaction(&self, transaction: Transaction) -> Result<(), StoreError> {
        let mut state = self.write()?;
        Self::require_account(&state, transaction.sender())?;
        Self::require_account(&state, transaction.receiver())?;

        match state
            .transactions
            .iter_mut()
            .find(|t| t.id() == transaction.id())
        {
            Some(existing) => *existing = transaction,
            None => state.transactions.push(transaction),
        }
        Ok(())
    }

    fn list_transactions(&self) -> Result<Vec<Transaction>, StoreError> {
        Ok(self.read()?.transactions.clone())
    }

    fn find_transactions_for_sender_on_day(
        &self,
        sender: AccountId,
        day: NaiveDate,
    ) -> Result<Vec<Transaction>, StoreError> {
        let state = self.read()?;
        Ok(state
            .transactions
            .iter()
            .filter(|t| t.sender() == sender && t.created().date_naive() == day)
            .cloned()
            .collect())
    }

    fn commit_transfer(&self, plan: TransferPlan) -> Result<Transaction, StoreError> {
        let mut state = self.write()?;

        let sender_id = plan.transaction().sender();
        let receiver_id = plan.transaction().receiver();

        let mut sender = state
            .accounts
            .get(&sender_id)
            .cloned()
            .ok_or(StoreError::AccountNotFound(sender_id))?;
        let mut receiver = state
            .accounts
            .get(&receiver_id)
            .cloned()
            .ok_or(StoreError::AccountNotFound(receiver_id))?;

        let day = plan.transaction().created().date_naive();
        let spent_today = spent_on_day(&state.transactions, sender_id, day);
        plan.recheck(&sender, spent_today).map_err(StoreError::Rejected)?;

        // Nothing is written until every fallible step has passed.
        let committed = plan.commit_to(&mut sender, &mut receiver)?;

        upsert(&mut state.accounts, sender);
        upsert(&mut state.accounts, receiver);
        state.transactions.push(committed.clone());

        Ok(committed)
    }

    fn save_deposit(&self, mut deposit: Deposit, saved_at: DateTime<Utc>) -> Result<Deposit, StoreError> {
        let mut state = self.write()?;
        Self::require_account(&state, deposit.owner())?;

        deposit.mark_saved(saved_at);
        upsert(&mut state.deposits, deposit.clone());
        Ok(deposit)
    }

    fn find_deposit(&self, id: DepositId) -> Result<Option<Deposit>, StoreError> {
        Ok(self.read()?.deposits.get(&id).cloned())
    }

    fn list_deposits(&self) -> Result<Vec<Deposit>, StoreError> {
        let state = self.read()?;
        let mut deposits: Vec<Deposit> = state.deposits.values().cloned().collect();
        deposits.sort_by_key(|d| (d.created(), d.id_typed()));
        Ok(deposits)
    }

    fn delete_account(&self, id: AccountId) -> Result<DeletionReport, StoreError> {
        let mut state = self.write()?;
        Self::require_account(&state, id)?;

        if self.deletion.transaction_parties == ReferencePolicy::Protect {
            let count = state.transactions.iter().filter(|t| t.involves(id)).count();
            if count > 0 {
                return Err(StoreError::Protected {
                    account: id,
                    relation: "transactions",
                    count,
                });
            }
        }
        if self.deletion.deposit_owner == ReferencePolicy::Protect {
            let count = state.deposits.values().filter(|d| d.owner() == id).count();
            if count > 0 {
                return Err(StoreError::Protected {
                    account: id,
                    relation: "deposits",
                    count,
                });
            }
        }

        // Protected relations are empty by now; one retain pass per table.
        let before = (state.transactions.len(), state.deposits.len());
        state.transactions.retain(|t| !t.involves(id));
        state.deposits.retain(|_, d| d.owner() != id);
        state.accounts.remove(&id);

        Ok(DeletionReport {
            transactions_removed: before.0 - state.transactions.len(),
            deposits_removed: before.1 - state.deposits.len(),
        })
    }
}
