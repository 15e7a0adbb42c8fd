use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use minibank_core::{AccountId, DepositId};
use minibank_ledger::{Deposit, DepositPolicy, current_value, validate_principal};

use super::LedgerError;
use crate::store::{LedgerStore, StoreError};

/// Deposit fields as shown in listings, plus the derived current value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositView {
    pub id: DepositId,
    pub owner: AccountId,
    pub username: String,
    pub principal: Decimal,
    pub created: DateTime<Utc>,
    pub last_saved_at: DateTime<Utc>,
    pub current_value: Decimal,
}

impl core::fmt::Display for DepositView {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {}", self.username, self.principal)
    }
}

/// Opens deposits and reports what they are worth.
#[derive(Debug)]
pub struct DepositService<S> {
    store: S,
    policy: DepositPolicy,
}

impl<S> DepositService<S> {
    pub fn new(store: S, policy: DepositPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &DepositPolicy {
        &self.policy
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> DepositService<S>
where
    S: LedgerStore,
{
    /// Open a deposit of `principal` for `owner` at `now`.
    pub fn open_deposit(
        &self,
        owner: AccountId,
        principal: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Deposit, LedgerError> {
        if let Err(e) = validate_principal(principal, &self.policy) {
            tracing::warn!(owner = %owner, principal = %principal, "deposit rejected: {e}");
            return Err(e.into());
        }
        if self.store.find_account(owner)?.is_none() {
            return Err(StoreError::AccountNotFound(owner).into());
        }

        let deposit = Deposit::open(owner, principal, now, &self.policy)?;
        let deposit = self.store.save_deposit(deposit, now)?;

        tracing::info!(deposit = %deposit.id_typed(), owner = %owner, principal = %principal, "deposit opened");
        Ok(deposit)
    }

    /// Value of a stored deposit as of `now`.
    pub fn current_value(&self, id: DepositId, now: DateTime<Utc>) -> Result<Decimal, LedgerError> {
        let deposit = self.load(id)?;
        let value = current_value(&deposit, now, &self.policy);
        tracing::debug!(
            deposit = %id,
            minutes = deposit.elapsed_minutes(now, self.policy.basis),
            value = %value,
            "deposit value computed"
        );
        Ok(value)
    }

    /// Re-save a deposit without changing it, refreshing its save time.
    pub fn touch(&self, id: DepositId, now: DateTime<Utc>) -> Result<Deposit, LedgerError> {
        let deposit = self.load(id)?;
        Ok(self.store.save_deposit(deposit, now)?)
    }

    /// Every deposit with owner name and current value, oldest first.
    pub fn list_views(&self, now: DateTime<Utc>) -> Result<Vec<DepositView>, LedgerError> {
        self.store
            .list_deposits()?
            .into_iter()
            .map(|d| -> Result<DepositView, LedgerError> {
                let owner = self
                    .store
                    .find_account(d.owner())?
                    .ok_or(StoreError::AccountNotFound(d.owner()))?;
                Ok(DepositView {
                    id: d.id_typed(),
                    owner: d.owner(),
                    username: owner.username().to_string(),
                    principal: d.principal(),
                    created: d.created(),
                    last_saved_at: d.last_saved_at(),
                    current_value: current_value(&d, now, &self.policy),
                })
            })
            .collect()
    }

    fn load(&self, id: DepositId) -> Result<Deposit, LedgerError> {
        Ok(self
            .store
            .find_deposit(id)?
            .ok_or(StoreError::DepositNotFound(id))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use minibank_ledger::{Account, AccrualBasis, DepositError};
    use rust_decimal_macros::dec;

    use crate::store::InMemoryLedgerStore;

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap()
    }

    fn setup(policy: DepositPolicy) -> (DepositService<InMemoryLedgerStore>, AccountId) {
        let store = InMemoryLedgerStore::new();
        let aida = Account::new(AccountId::new(), "aida", "+77010000001", 0);
        let id = aida.id_typed();
        store.save_account(aida).unwrap();
        (DepositService::new(store, policy), id)
    }

    #[test]
    fn opened_deposit_accrues_from_creation() {
        let (service, aida) = setup(DepositPolicy::default());
        let deposit = service.open_deposit(aida, dec!(1000), test_time()).unwrap();

        assert_eq!(service.current_value(deposit.id_typed(), test_time()).unwrap(), dec!(1000));
        let later = test_time() + Duration::minutes(10);
        assert_eq!(service.current_value(deposit.id_typed(), later).unwrap(), dec!(2200));
    }

    #[test]
    fn small_principal_is_rejected_before_anything_is_stored() {
        let (service, aida) = setup(DepositPolicy::default());

        let err = service.open_deposit(aida, dec!(999), test_time()).unwrap_err();
        assert_eq!(
            err,
            LedgerError::Deposit(DepositError::PrincipalBelowMinimum { minimum: dec!(1000) })
        );
        assert!(service.store().list_deposits().unwrap().is_empty());
    }

    #[test]
    fn unknown_owner_or_deposit_is_a_store_error() {
        let (service, _) = setup(DepositPolicy::default());
        let ghost = AccountId::new();
        assert_eq!(
            service.open_deposit(ghost, dec!(1000), test_time()).unwrap_err(),
            LedgerError::Store(StoreError::AccountNotFound(ghost))
        );

        let missing = DepositId::new();
        assert_eq!(
            service.current_value(missing, test_time()).unwrap_err(),
            LedgerError::Store(StoreError::DepositNotFound(missing))
        );
    }

    #[test]
    fn touching_resets_accrual_only_under_last_saved_basis() {
        let creation = DepositPolicy::default();
        let last_saved = DepositPolicy {
            basis: AccrualBasis::LastSaved,
            ..DepositPolicy::default()
        };

        for (policy, expected) in [(creation, dec!(2200)), (last_saved, dec!(1600))] {
            let (service, aida) = setup(policy);
            let deposit = service.open_deposit(aida, dec!(1000), test_time()).unwrap();

            service.touch(deposit.id_typed(), test_time() + Duration::minutes(5)).unwrap();

            let now = test_time() + Duration::minutes(10);
            assert_eq!(service.current_value(deposit.id_typed(), now).unwrap(), expected);
        }
    }

    #[test]
    fn listing_shows_raw_fields_and_current_value() {
        let (service, aida) = setup(DepositPolicy::default());
        service.open_deposit(aida, dec!(1500.5), test_time()).unwrap();
        service
            .open_deposit(aida, dec!(3000), test_time() + Duration::minutes(1))
            .unwrap();

        let now = test_time() + Duration::minutes(2);
        let views = service.list_views(now).unwrap();

        assert_eq!(views.len(), 2);
        assert_eq!(views[0].username, "aida");
        assert_eq!(views[0].principal, dec!(1500.5));
        assert_eq!(views[0].created, test_time());
        assert_eq!(views[0].current_value, dec!(1500.5) + dec!(1500.5) * dec!(0.12) * dec!(2));
        assert_eq!(views[1].current_value, dec!(3360));
        assert_eq!(views[0].to_string(), "aida 1500.5");
    }
}
