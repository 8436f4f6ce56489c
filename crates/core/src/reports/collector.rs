//! Batched balance collection for account data rows.

use std::collections::{BTreeSet, HashMap};

use finstat_shared::types::AccountId;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::template::ReportRow;
use crate::accounts::{AccountCatalog, AccountResolver};
use crate::fiscal::Period;
use crate::ledger::{
    BalanceProcessor, ClosingSnapshotSource, DataRequest, DataSource, LedgerError, LedgerSource,
    ReportContext,
};

/// The storage collaborators a report run reads from.
#[derive(Clone, Copy)]
pub struct LedgerSources<'a> {
    /// Chart of accounts.
    pub accounts: &'a dyn AccountCatalog,
    /// General ledger postings.
    pub ledger: &'a dyn LedgerSource,
    /// Closing balance snapshots.
    pub snapshots: &'a dyn ClosingSnapshotSource,
}

/// Collects every account data row's needs, fetches balances once and
/// distributes per-row totals.
pub struct PeriodAccountDataCollector<'a> {
    ctx: &'a ReportContext,
    periods: &'a [Period],
    sources: LedgerSources<'a>,
    requests: Vec<DataRequest>,
}

impl<'a> PeriodAccountDataCollector<'a> {
    /// Creates an empty collector for one run.
    #[must_use]
    pub fn new(ctx: &'a ReportContext, periods: &'a [Period], sources: LedgerSources<'a>) -> Self {
        Self {
            ctx,
            periods,
            sources,
            requests: Vec::new(),
        }
    }

    /// Resolves the row's accounts and queues a request; returns its index.
    ///
    /// Rows without a filter or data source contribute zeros.
    ///
    /// # Errors
    ///
    /// Propagates account catalog failures.
    pub fn add_data_request(&mut self, row: &ReportRow) -> Result<usize, LedgerError> {
        let (accounts, data_source) = match (row.expression(), row.data_source) {
            (Some(filter), Some(data_source)) => {
                let resolver = AccountResolver::new(self.sources.accounts, self.ctx.company());
                (resolver.resolve(filter)?, data_source)
            }
            (_, data_source) => {
                warn!(
                    reference_code = row.reference_code.as_deref().unwrap_or_default(),
                    "Incomplete account data row, reporting zeros"
                );
                (Vec::new(), data_source.unwrap_or(DataSource::ClosingBalance))
            }
        };

        self.requests
            .push(DataRequest::new(row.reference_code.clone(), accounts, data_source));
        Ok(self.requests.len() - 1)
    }

    /// Queued requests in insertion order.
    #[must_use]
    pub fn requests(&self) -> &[DataRequest] {
        &self.requests
    }

    /// Per-period totals for every request, in insertion order.
    ///
    /// # Errors
    ///
    /// Propagates ledger and snapshot failures.
    pub fn process_requests(&self) -> Result<Vec<Vec<Decimal>>, LedgerError> {
        let universe: Vec<AccountId> = self
            .requests
            .iter()
            .flat_map(|r| r.accounts.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        debug!(
            company = %self.ctx.company(),
            requests = self.requests.len(),
            accounts = universe.len(),
            "Fetching balances for account data rows"
        );

        let processor = BalanceProcessor::new(
            self.ctx,
            self.periods,
            self.sources.ledger,
            self.sources.snapshots,
        );
        let data = processor.fetch_all_balances(&universe)?;

        Ok(self
            .requests
            .iter()
            .map(|request| processor.calculate_totals(request, &data))
            .collect())
    }

    /// Per-period totals keyed by reference code.
    ///
    /// Rows whose filter matched no accounts map to an all-zero series.
    /// Requests without a reference code are computed but not returned.
    ///
    /// # Errors
    ///
    /// Propagates ledger and snapshot failures.
    pub fn process_all_requests(&self) -> Result<HashMap<String, Vec<Decimal>>, LedgerError> {
        Ok(self
            .requests
            .iter()
            .zip(self.process_requests()?)
            .filter_map(|(request, totals)| Some((request.reference_code.clone()?, totals)))
            .collect())
    }
}
