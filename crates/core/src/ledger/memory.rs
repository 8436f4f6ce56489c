//! In-memory ledger backed by plain vectors.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use finstat_shared::types::{AccountId, CompanyId};
use rust_decimal::Decimal;

use super::context::ReportContext;
use super::entry::{ClosingSnapshot, GlEntry};
use super::error::LedgerError;
use super::source::{ClosingSnapshotSource, LedgerSource, MovementRow, SnapshotRef};
use crate::fiscal::Period;

/// Postings and closing snapshots held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    entries: Vec<GlEntry>,
    snapshots: Vec<ClosingSnapshot>,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a posting.
    #[must_use]
    pub fn with_entry(mut self, entry: GlEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Adds a closing snapshot.
    #[must_use]
    pub fn with_snapshot(mut self, snapshot: ClosingSnapshot) -> Self {
        self.snapshots.push(snapshot);
        self
    }

    /// Adds a posting in place.
    pub fn push_entry(&mut self, entry: GlEntry) {
        self.entries.push(entry);
    }

    /// Adds a closing snapshot in place.
    pub fn push_snapshot(&mut self, snapshot: ClosingSnapshot) {
        self.snapshots.push(snapshot);
    }

    fn matching_entries<'a>(
        &'a self,
        ctx: &ReportContext,
        accounts: &'a [AccountId],
    ) -> impl Iterator<Item = &'a GlEntry> {
        let filter = ctx.ledger_filter();
        let wanted: HashSet<&AccountId> = accounts.iter().collect();
        self.entries
            .iter()
            .filter(move |e| wanted.contains(&e.account) && filter.matches_entry(e))
    }
}

impl LedgerSource for InMemoryLedger {
    fn period_movements(
        &self,
        ctx: &ReportContext,
        accounts: &[AccountId],
        periods: &[Period],
    ) -> Result<Vec<MovementRow>, LedgerError> {
        let Some(first) = periods.first() else {
            return Ok(Vec::new());
        };

        let mut rows: BTreeMap<&AccountId, HashMap<String, Decimal>> = BTreeMap::new();
        for entry in self
            .matching_entries(ctx, accounts)
            .filter(|e| e.posting_date >= first.from_date)
        {
            let movements = rows.entry(&entry.account).or_insert_with(|| {
                periods
                    .iter()
                    .map(|p| (p.key.clone(), Decimal::ZERO))
                    .collect()
            });
            if let Some(period) = periods.iter().find(|p| p.contains_date(entry.posting_date))
                && let Some(total) = movements.get_mut(&period.key)
            {
                *total += entry.signed_amount();
            }
        }

        Ok(rows
            .into_iter()
            .map(|(account, movements)| MovementRow {
                account: account.clone(),
                movements,
            })
            .collect())
    }

    fn gap_movements(
        &self,
        ctx: &ReportContext,
        accounts: &[AccountId],
        after: NaiveDate,
        before: NaiveDate,
    ) -> Result<HashMap<AccountId, Decimal>, LedgerError> {
        let mut totals: HashMap<AccountId, Decimal> = HashMap::new();
        for entry in self
            .matching_entries(ctx, accounts)
            .filter(|e| e.posting_date > after && e.posting_date < before)
        {
            *totals.entry(entry.account.clone()).or_default() += entry.signed_amount();
        }
        Ok(totals)
    }
}

impl ClosingSnapshotSource for InMemoryLedger {
    fn latest_snapshot(
        &self,
        company: &CompanyId,
        before: NaiveDate,
    ) -> Result<Option<SnapshotRef>, LedgerError> {
        Ok(self
            .snapshots
            .iter()
            .filter(|s| s.finalized && &s.company == company && s.period_end_date < before)
            .max_by_key(|s| s.period_end_date)
            .map(|s| SnapshotRef {
                name: s.name.clone(),
                period_end_date: s.period_end_date,
            }))
    }

    fn snapshot_balances(
        &self,
        ctx: &ReportContext,
        snapshot: &SnapshotRef,
        accounts: &[AccountId],
    ) -> Result<HashMap<AccountId, Decimal>, LedgerError> {
        let stored = self
            .snapshots
            .iter()
            .find(|s| s.name == snapshot.name)
            .ok_or_else(|| LedgerError::SnapshotNotFound(snapshot.name.to_string()))?;

        let filter = ctx.ledger_filter();
        let wanted: HashSet<&AccountId> = accounts.iter().collect();
        let mut balances: HashMap<AccountId, Decimal> = HashMap::new();
        for balance in stored
            .balances
            .iter()
            .filter(|b| wanted.contains(&b.account) && filter.matches_snapshot_balance(b))
        {
            *balances.entry(balance.account.clone()).or_default() += balance.signed_amount();
        }
        Ok(balances)
    }
}
