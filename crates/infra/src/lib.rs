//! Infrastructure layer: storage, configuration and the services that
//! compose them with the ledger's rules.

pub mod config;
pub mod service;
pub mod store;

pub use config::{ConfigError, LedgerConfig};
pub use service::{DepositService, DepositView, LedgerError, TransactionView, TransferService};
pub use store::{
    DeletionPolicy, DeletionReport, InMemoryLedgerStore, LedgerStore, ReferencePolicy, StoreError,
};
