//! Storage seams the balance computation reads through.

use std::collections::HashMap;

use chrono::NaiveDate;
use finstat_shared::types::{AccountId, CompanyId, SnapshotId};
use rust_decimal::Decimal;

use super::context::ReportContext;
use super::error::LedgerError;
use crate::fiscal::Period;

/// Per-period net movement of one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementRow {
    /// Account.
    pub account: AccountId,
    /// Debit minus credit per period key; every requested period is present.
    pub movements: HashMap<String, Decimal>,
}

/// Identifies the closing snapshot a run starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRef {
    /// Snapshot identifier.
    pub name: SnapshotId,
    /// Date the balances are valid at (inclusive).
    pub period_end_date: NaiveDate,
}

/// Read access to general ledger postings.
pub trait LedgerSource {
    /// Returns one row per account with at least one matching posting on or
    /// after the first period's start.
    ///
    /// Postings are filtered by the context's [`LedgerFilter`](super::LedgerFilter).
    fn period_movements(
        &self,
        ctx: &ReportContext,
        accounts: &[AccountId],
        periods: &[Period],
    ) -> Result<Vec<MovementRow>, LedgerError>;

    /// Returns the net movement per account strictly between `after` and
    /// `before`. Accounts without postings may be omitted.
    fn gap_movements(
        &self,
        ctx: &ReportContext,
        accounts: &[AccountId],
        after: NaiveDate,
        before: NaiveDate,
    ) -> Result<HashMap<AccountId, Decimal>, LedgerError>;
}

/// Read access to persisted closing balances.
pub trait ClosingSnapshotSource {
    /// Returns the latest finalized snapshot of `company` ending strictly
    /// before `before`.
    fn latest_snapshot(
        &self,
        company: &CompanyId,
        before: NaiveDate,
    ) -> Result<Option<SnapshotRef>, LedgerError>;

    /// Returns the snapshot's balance per account. Accounts without a
    /// balance may be omitted.
    fn snapshot_balances(
        &self,
        ctx: &ReportContext,
        snapshot: &SnapshotRef,
        accounts: &[AccountId],
    ) -> Result<HashMap<AccountId, Decimal>, LedgerError>;
}
