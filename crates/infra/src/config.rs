//! Configuration loading and representation.
//!
//! Defaults reproduce the house rules (transfers of 100..=100 000, a daily cap
//! of 500 000, deposits from 1000 accruing 12% of principal per minute).
//! Environment variables override individual values:
//!
//! | variable | field |
//! |---|---|
//! | `MINIBANK_MIN_TRANSFER` | `transfer.min_amount` |
//! | `MINIBANK_MAX_TRANSFER` | `transfer.max_amount` |
//! | `MINIBANK_DAILY_CAP` | `transfer.daily_cap` |
//! | `MINIBANK_MIN_DEPOSIT` | `deposit.min_principal` |
//! | `MINIBANK_MAX_DEPOSIT` | `deposit.max_principal` |
//! | `MINIBANK_DEPOSIT_RATE` | `deposit.rate_per_minute` |
//! | `MINIBANK_ACCRUAL_BASIS` | `deposit.basis` (`creation` / `last_saved`) |
//! | `MINIBANK_DELETE_TRANSACTIONS` | `deletion.transaction_parties` (`cascade` / `protect`) |
//! | `MINIBANK_DELETE_DEPOSITS` | `deletion.deposit_owner` (`cascade` / `protect`) |

use core::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use minibank_core::{DomainError, DomainResult};
use minibank_ledger::{DepositPolicy, TransferLimits};

use crate::store::DeletionPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unusable configuration: {0}")]
    Invalid(#[from] DomainError),
}

/// Runtime settings for the ledger services and store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub transfer: TransferLimits,
    pub deposit: DepositPolicy,
    pub deletion: DeletionPolicy,
}

impl LedgerConfig {
    /// Defaults overlaid with `MINIBANK_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns for each known key.
    ///
    /// Unparseable values are logged and ignored. If the overlay leaves a
    /// section inconsistent, that whole section falls back to its defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        overlay_parsed(&lookup, "MINIBANK_MIN_TRANSFER", &mut config.transfer.min_amount);
        overlay_parsed(&lookup, "MINIBANK_MAX_TRANSFER", &mut config.transfer.max_amount);
        overlay_parsed(&lookup, "MINIBANK_DAILY_CAP", &mut config.transfer.daily_cap);
        overlay_parsed(&lookup, "MINIBANK_MIN_DEPOSIT", &mut config.deposit.min_principal);
        overlay_parsed(&lookup, "MINIBANK_MAX_DEPOSIT", &mut config.deposit.max_principal);
        overlay_parsed(&lookup, "MINIBANK_DEPOSIT_RATE", &mut config.deposit.rate_per_minute);
        overlay_named(&lookup, "MINIBANK_ACCRUAL_BASIS", &mut config.deposit.basis);
        overlay_named(&lookup, "MINIBANK_DELETE_TRANSACTIONS", &mut config.deletion.transaction_parties);
        overlay_named(&lookup, "MINIBANK_DELETE_DEPOSITS", &mut config.deletion.deposit_owner);

        if let Err(e) = config.transfer.check() {
            tracing::warn!("transfer limits from environment rejected ({e}); using defaults");
            config.transfer = TransferLimits::default();
        }
        if let Err(e) = config.deposit.check() {
            tracing::warn!("deposit policy from environment rejected ({e}); using defaults");
            config.deposit = DepositPolicy::default();
        }

        config
    }

    /// Parse a JSON document; missing sections take their defaults.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.check()?;
        Ok(config)
    }

    pub fn check(&self) -> DomainResult<()> {
        self.transfer.check()?;
        self.deposit.check()
    }
}

fn overlay_parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, target: &mut T)
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    let Some(raw) = lookup(key) else { return };
    match raw.trim().parse::<T>() {
        Ok(value) => *target = value,
        Err(e) => tracing::warn!(key, value = %raw, "ignoring invalid setting: {e}"),
    }
}

fn overlay_named<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, target: &mut T)
where
    T: DeserializeOwned,
{
    let Some(raw) = lookup(key) else { return };
    match serde_json::from_value::<T>(JsonValue::String(raw.trim().to_ascii_lowercase())) {
        Ok(value) => *target = value,
        Err(e) => tracing::warn!(key, value = %raw, "ignoring invalid setting: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use minibank_ledger::AccrualBasis;
    use rust_decimal_macros::dec;

    use crate::store::ReferencePolicy;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = LedgerConfig::from_lookup(lookup(&[]));
        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.transfer.daily_cap, 500_000);
        assert_eq!(config.deposit.rate_per_minute, dec!(0.12));
        assert_eq!(config.deletion.deposit_owner, ReferencePolicy::Protect);
    }

    #[test]
    fn environment_overrides_individual_values() {
        let config = LedgerConfig::from_lookup(lookup(&[
            ("MINIBANK_DAILY_CAP", "750000"),
            ("MINIBANK_DEPOSIT_RATE", "0.005"),
            ("MINIBANK_ACCRUAL_BASIS", "Last_Saved"),
            ("MINIBANK_DELETE_TRANSACTIONS", "protect"),
        ]));

        assert_eq!(config.transfer.daily_cap, 750_000);
        assert_eq!(config.transfer.min_amount, 100);
        assert_eq!(config.deposit.rate_per_minute, dec!(0.005));
        assert_eq!(config.deposit.basis, AccrualBasis::LastSaved);
        assert_eq!(config.deletion.transaction_parties, ReferencePolicy::Protect);
    }

    #[test]
    fn garbage_values_are_ignored() {
        let config = LedgerConfig::from_lookup(lookup(&[
            ("MINIBANK_MIN_TRANSFER", "a lot"),
            ("MINIBANK_DELETE_DEPOSITS", "shred"),
        ]));
        assert_eq!(config, LedgerConfig::default());
    }

    #[test]
    fn inconsistent_section_falls_back_to_defaults() {
        let config = LedgerConfig::from_lookup(lookup(&[
            ("MINIBANK_MIN_TRANSFER", "5000"),
            ("MINIBANK_MAX_TRANSFER", "10"),
            ("MINIBANK_MIN_DEPOSIT", "2000"),
        ]));
        assert_eq!(config.transfer, TransferLimits::default());
        assert_eq!(config.deposit.min_principal, dec!(2000));
    }

    #[test]
    fn json_sections_are_optional() {
        let config = LedgerConfig::from_json(
            r#"{"transfer":{"min_amount":1,"max_amount":100000,"daily_cap":500000}}"#,
        )
        .unwrap();
        assert_eq!(config.transfer.min_amount, 1);
        assert_eq!(config.deposit, DepositPolicy::default());
    }

    #[test]
    fn json_is_checked() {
        let err = LedgerConfig::from_json(
            r#"{"transfer":{"min_amount":0,"max_amount":100000,"daily_cap":500000}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        assert!(matches!(LedgerConfig::from_json("{"), Err(ConfigError::Parse(_))));
    }
}
