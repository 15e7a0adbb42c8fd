use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use minibank_core::{AccountId, DepositId, DomainError, DomainResult, Entity};

use crate::error::DepositError;

/// Which timestamp closes the accrual window that opens at `created`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccrualBasis {
    /// Accrue from creation up to the query time.
    #[default]
    Creation,
    /// Accrue from creation up to the last time the deposit was saved.
    ///
    /// Any re-save moves the window, including saves unrelated to the deposit's value.
    LastSaved,
}

/// Rules for opening deposits and growing their value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositPolicy {
    pub min_principal: Decimal,
    pub max_principal: Decimal,
    /// Share of the principal added for every whole elapsed minute.
    pub rate_per_minute: Decimal,
    #[serde(default)]
    pub basis: AccrualBasis,
}

impl DepositPolicy {
    /// Principal is stored with a single fractional digit.
    pub const PRINCIPAL_SCALE: u32 = 1;

    pub fn new(
        min_principal: Decimal,
        max_principal: Decimal,
        rate_per_minute: Decimal,
        basis: AccrualBasis,
    ) -> DomainResult<Self> {
        let policy = Self {
            min_principal,
            max_principal,
            rate_per_minute,
            basis,
        };
        policy.check()?;
        Ok(policy)
    }

    pub fn check(&self) -> DomainResult<()> {
        if self.min_principal <= Decimal::ZERO {
            return Err(DomainError::validation("minimum principal must be positive"));
        }
        if self.min_principal > self.max_principal {
            return Err(DomainError::validation(format!(
                "minimum principal {} exceeds maximum {}",
                self.min_principal, self.max_principal
            )));
        }
        if self.rate_per_minute.is_sign_negative() {
            return Err(DomainError::validation("accrual rate cannot be negative"));
        }
        Ok(())
    }
}

impl Default for DepositPolicy {
    fn default() -> Self {
        Self {
            min_principal: dec!(1000),
            max_principal: dec!(99999999.9),
            rate_per_minute: dec!(0.12),
            basis: AccrualBasis::default(),
        }
    }
}

/// A principal held on behalf of an account.
///
/// The accrued value is never stored; see [`current_value`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    id: DepositId,
    owner: AccountId,
    principal: Decimal,
    created: DateTime<Utc>,
    last_saved_at: DateTime<Utc>,
}

impl Deposit {
    /// Open a deposit at `now` after checking the principal.
    pub fn open(
        owner: AccountId,
        principal: Decimal,
        now: DateTime<Utc>,
        policy: &DepositPolicy,
    ) -> Result<Self, DepositError> {
        validate_principal(principal, policy)?;
        Ok(Self {
            id: DepositId::new(),
            owner,
            principal,
            created: now,
            last_saved_at: now,
        })
    }

    pub fn id_typed(&self) -> DepositId {
        self.id
    }

    pub fn owner(&self) -> AccountId {
        self.owner
    }

    pub fn principal(&self) -> Decimal {
        self.principal
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn last_saved_at(&self) -> DateTime<Utc> {
        self.last_saved_at
    }

    /// Bookkeeping for the persistence layer: record when this deposit was written.
    pub fn mark_saved(&mut self, at: DateTime<Utc>) {
        self.last_saved_at = at;
    }

    /// Whole minutes between creation and the end of the accrual window.
    ///
    /// A window ending before `created` counts as zero.
    pub fn elapsed_minutes(&self, now: DateTime<Utc>, basis: AccrualBasis) -> i64 {
        let end = match basis {
            AccrualBasis::Creation => now,
            AccrualBasis::LastSaved => self.last_saved_at,
        };
        (end - self.created).num_minutes().max(0)
    }
}

impl Entity for Deposit {
    type Id = DepositId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Creation-time rule for the principal.
pub fn validate_principal(principal: Decimal, policy: &DepositPolicy) -> Result<(), DepositError> {
    if principal < policy.min_principal {
        return Err(DepositError::PrincipalBelowMinimum {
            minimum: policy.min_principal,
        });
    }
    if principal > policy.max_principal || principal.normalize().scale() > DepositPolicy::PRINCIPAL_SCALE {
        return Err(DepositError::PrincipalOutOfRange {
            principal,
            max: policy.max_principal,
        });
    }
    Ok(())
}

/// Linear accrual: `principal + principal * rate * elapsed_minutes`.
///
/// Saturates at `Decimal::MAX` instead of overflowing.
pub fn current_value(deposit: &Deposit, now: DateTime<Utc>, policy: &DepositPolicy) -> Decimal {
    let minutes = Decimal::from(deposit.elapsed_minutes(now, policy.basis));
    deposit
        .principal
        .checked_mul(policy.rate_per_minute)
        .and_then(|per_minute| per_minute.checked_mul(minutes))
        .and_then(|accrued| accrued.checked_add(deposit.principal))
        .unwrap_or(Decimal::MAX)
}
