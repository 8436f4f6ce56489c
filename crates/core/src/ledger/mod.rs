//! Ledger access and per-period balance computation.
//!
//! This module implements the data side of report generation:
//! - Ledger records (postings and closing snapshots)
//! - Per-run report context and the row filter derived from it
//! - Storage seams with an in-memory implementation
//! - Opening / movement / closing balances per account and period

pub mod balance;
pub mod context;
pub mod entry;
pub mod error;
pub mod memory;
pub mod source;

#[cfg(test)]
mod balance_props;

pub use balance::{BalanceData, BalanceProcessor, DataRequest, DataSource, PeriodBalance};
pub use context::{LedgerFilter, ReportContext, ReportFilters};
pub use entry::{ClosingSnapshot, GlEntry, SnapshotBalance};
pub use error::LedgerError;
pub use memory::InMemoryLedger;
pub use source::{ClosingSnapshotSource, LedgerSource, MovementRow, SnapshotRef};
