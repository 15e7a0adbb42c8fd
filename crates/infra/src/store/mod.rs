//! Persistence boundary for accounts, transfers and deposits.
//!
//! This module defines an infrastructure-facing abstraction over the ledger's
//! records without making any storage assumptions.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use r#trait::{DeletionPolicy, DeletionReport, LedgerStore, ReferencePolicy, StoreError};
