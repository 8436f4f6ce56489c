//! Per-period account balance calculations.
//!
//! Balances start from the latest closing snapshot before the first period
//! (rebased by any ledger movement in between) and run forward:
//! - closing = opening + movement
//! - opening of period N+1 = closing of period N

use std::collections::{BTreeMap, HashMap};

use finstat_shared::types::AccountId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::context::ReportContext;
use super::error::LedgerError;
use super::source::{ClosingSnapshotSource, LedgerSource};
use crate::fiscal::Period;

/// Which component of a period balance a report row shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataSource {
    /// Balance at the start of the period.
    #[serde(rename = "Opening Balance")]
    OpeningBalance,
    /// Balance at the end of the period.
    #[serde(rename = "Closing Balance")]
    ClosingBalance,
    /// Net movement within the period.
    #[serde(rename = "Period Movement (Debit - Credit)", alias = "Period Movement")]
    PeriodMovement,
}

/// Balance of one account in one period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodBalance {
    /// Balance at the start of the period.
    pub opening: Decimal,
    /// Debit minus credit within the period.
    pub movement: Decimal,
    /// Balance at the end of the period.
    pub closing: Decimal,
}

impl PeriodBalance {
    /// Creates a balance from an opening value and the period's movement.
    ///
    /// Invariant: closing = opening + movement
    #[must_use]
    pub fn new(opening: Decimal, movement: Decimal) -> Self {
        Self {
            opening,
            movement,
            closing: opening + movement,
        }
    }

    /// Returns the component selected by `source`.
    #[must_use]
    pub const fn get(&self, source: DataSource) -> Decimal {
        match source {
            DataSource::OpeningBalance => self.opening,
            DataSource::ClosingBalance => self.closing,
            DataSource::PeriodMovement => self.movement,
        }
    }
}

/// Period balances keyed by account, then by period key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceData {
    accounts: BTreeMap<AccountId, HashMap<String, PeriodBalance>>,
}

impl BalanceData {
    /// Returns the balance of `account` in the period with `period_key`.
    #[must_use]
    pub fn get(&self, account: &AccountId, period_key: &str) -> Option<&PeriodBalance> {
        self.accounts.get(account)?.get(period_key)
    }

    /// Returns true if the account has any balance.
    #[must_use]
    pub fn contains_account(&self, account: &AccountId) -> bool {
        self.accounts.contains_key(account)
    }

    /// Iterates the accounts with balances in ascending order.
    pub fn accounts(&self) -> impl Iterator<Item = &AccountId> {
        self.accounts.keys()
    }

    /// Number of accounts with balances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Returns true if no account has a balance.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

/// A row's need for data: its resolved accounts and the balance component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRequest {
    /// Code of the requesting row.
    pub reference_code: Option<String>,
    /// Accounts in ascending order, without duplicates.
    pub accounts: Vec<AccountId>,
    /// Balance component to sum.
    pub data_source: DataSource,
}

impl DataRequest {
    /// Creates a request, sorting and deduplicating the accounts.
    #[must_use]
    pub fn new(
        reference_code: Option<String>,
        mut accounts: Vec<AccountId>,
        data_source: DataSource,
    ) -> Self {
        accounts.sort();
        accounts.dedup();
        Self {
            reference_code,
            accounts,
            data_source,
        }
    }
}

/// Computes per-period balances for a report run.
pub struct BalanceProcessor<'a> {
    ctx: &'a ReportContext,
    periods: &'a [Period],
    ledger: &'a dyn LedgerSource,
    snapshots: &'a dyn ClosingSnapshotSource,
}

impl<'a> BalanceProcessor<'a> {
    /// Creates a processor for one run.
    #[must_use]
    pub fn new(
        ctx: &'a ReportContext,
        periods: &'a [Period],
        ledger: &'a dyn LedgerSource,
        snapshots: &'a dyn ClosingSnapshotSource,
    ) -> Self {
        Self {
            ctx,
            periods,
            ledger,
            snapshots,
        }
    }

    /// Computes opening, movement and closing for every account in every period.
    ///
    /// Accounts with neither a baseline nor ledger movement are absent from
    /// the result.
    ///
    /// # Errors
    ///
    /// Propagates collaborator failures.
    pub fn fetch_all_balances(&self, accounts: &[AccountId]) -> Result<BalanceData, LedgerError> {
        if accounts.is_empty() || self.periods.is_empty() {
            return Ok(BalanceData::default());
        }

        let baseline = self.opening_baseline(accounts)?;
        let movements = self
            .ledger
            .period_movements(self.ctx, accounts, self.periods)?;

        let mut by_account: BTreeMap<AccountId, HashMap<String, Decimal>> = baseline
            .keys()
            .map(|account| (account.clone(), HashMap::new()))
            .collect();
        for row in movements {
            by_account.entry(row.account).or_default().extend(row.movements);
        }

        let balances = by_account
            .into_iter()
            .map(|(account, movements)| {
                let mut opening = baseline.get(&account).copied().unwrap_or_default();
                let per_period = self
                    .periods
                    .iter()
                    .map(|period| {
                        let movement = movements.get(&period.key).copied().unwrap_or_default();
                        let balance = PeriodBalance::new(opening, movement);
                        opening = balance.closing;
                        (period.key.clone(), balance)
                    })
                    .collect();
                (account, per_period)
            })
            .collect::<BTreeMap<_, _>>();

        debug!(
            company = %self.ctx.company(),
            requested = accounts.len(),
            with_balances = balances.len(),
            periods = self.periods.len(),
            "Computed period balances"
        );
        Ok(BalanceData { accounts: balances })
    }

    /// Sums the requested component over the request's accounts, per period.
    ///
    /// Accounts without balances contribute zero.
    #[must_use]
    pub fn calculate_totals(&self, request: &DataRequest, data: &BalanceData) -> Vec<Decimal> {
        self.periods
            .iter()
            .map(|period| {
                request
                    .accounts
                    .iter()
                    .filter_map(|account| data.get(account, &period.key))
                    .map(|balance| balance.get(request.data_source))
                    .sum()
            })
            .collect()
    }

    /// Opening balances as of the first period's start.
    fn opening_baseline(
        &self,
        accounts: &[AccountId],
    ) -> Result<HashMap<AccountId, Decimal>, LedgerError> {
        if self.ctx.settings.ignore_account_closing_balance {
            debug!("Closing snapshots disabled, using ledger movement only");
            return Ok(HashMap::new());
        }

        let Some(first) = self.periods.first() else {
            return Ok(HashMap::new());
        };
        let Some(snapshot) = self
            .snapshots
            .latest_snapshot(self.ctx.company(), first.from_date)?
        else {
            debug!("No closing snapshot before first period");
            return Ok(HashMap::new());
        };

        let mut baseline = self
            .snapshots
            .snapshot_balances(self.ctx, &snapshot, accounts)?;

        let gap_days = (first.from_date - snapshot.period_end_date).num_days();
        if gap_days > 1 {
            let gap = self.ledger.gap_movements(
                self.ctx,
                accounts,
                snapshot.period_end_date,
                first.from_date,
            )?;
            for (account, movement) in gap {
                *baseline.entry(account).or_default() += movement;
            }
        }

        debug!(
            snapshot = %snapshot.name,
            period_end_date = %snapshot.period_end_date,
            gap_days,
            accounts = baseline.len(),
            "Opening baseline from closing snapshot"
        );
        Ok(baseline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::context::ReportFilters;
    use crate::ledger::entry::{ClosingSnapshot, GlEntry, SnapshotBalance};
    use crate::dimension::{DimensionFilter, DimensionTags};
    use crate::ledger::memory::InMemoryLedger;
    use chrono::NaiveDate;
    use finstat_shared::ReportSettings;
    use finstat_shared::types::{CompanyId, SnapshotId};
    use rust_decimal_macros::dec;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ctx(settings: ReportSettings) -> ReportContext {
        ReportContext::new(ReportFilters::new("TC"), settings, None).unwrap()
    }

    fn quarter_periods() -> Vec<Period> {
        vec![
            Period::new("jan", date(2024, 1, 1), date(2024, 1, 31)),
            Period::new("feb", date(2024, 2, 1), date(2024, 2, 29)),
            Period::new("mar", date(2024, 3, 1), date(2024, 3, 31)),
        ]
    }

    fn snapshot(end: NaiveDate, balances: Vec<SnapshotBalance>) -> ClosingSnapshot {
        ClosingSnapshot {
            name: SnapshotId::new("PCV-2023"),
            company: CompanyId::new("TC"),
            period_end_date: end,
            finalized: true,
            balances,
        }
    }

    fn cash() -> AccountId {
        AccountId::new("Cash - TC")
    }

    #[test]
    fn test_period_balance_invariant() {
        let balance = PeriodBalance::new(dec!(100), dec!(-25.50));
        assert_eq!(balance.closing, dec!(74.50));
        assert_eq!(balance.get(DataSource::OpeningBalance), dec!(100));
        assert_eq!(balance.get(DataSource::PeriodMovement), dec!(-25.50));
        assert_eq!(balance.get(DataSource::ClosingBalance), dec!(74.50));
    }

    #[test]
    fn test_running_balances_from_snapshot() {
        let ledger = InMemoryLedger::new()
            .with_snapshot(snapshot(
                date(2023, 12, 31),
                vec![SnapshotBalance::new("Cash - TC", dec!(1000), dec!(0))],
            ))
            .with_entry(GlEntry::debit("TC", "Cash - TC", date(2024, 1, 10), dec!(200)))
            .with_entry(GlEntry::credit("TC", "Cash - TC", date(2024, 3, 5), dec!(50)));

        let ctx = ctx(ReportSettings::default());
        let periods = quarter_periods();
        let processor = BalanceProcessor::new(&ctx, &periods, &ledger, &ledger);
        let data = processor.fetch_all_balances(&[cash()]).unwrap();

        let jan = data.get(&cash(), "jan").unwrap();
        assert_eq!((jan.opening, jan.movement, jan.closing), (dec!(1000), dec!(200), dec!(1200)));
        let feb = data.get(&cash(), "feb").unwrap();
        assert_eq!((feb.opening, feb.movement, feb.closing), (dec!(1200), dec!(0), dec!(1200)));
        let mar = data.get(&cash(), "mar").unwrap();
        assert_eq!((mar.opening, mar.movement, mar.closing), (dec!(1200), dec!(-50), dec!(1150)));
    }

    #[test]
    fn test_baseline_without_movement_carries_forward() {
        let ledger = InMemoryLedger::new().with_snapshot(snapshot(
            date(2023, 12, 31),
            vec![SnapshotBalance::new("Cash - TC", dec!(1000), dec!(0))],
        ));

        let ctx = ctx(ReportSettings::default());
        let periods = quarter_periods();
        let data = BalanceProcessor::new(&ctx, &periods, &ledger, &ledger)
            .fetch_all_balances(&[cash()])
            .unwrap();

        for period in &periods {
            let balance = data.get(&cash(), &period.key).unwrap();
            assert_eq!(balance.opening, dec!(1000));
            assert_eq!(balance.movement, dec!(0));
            assert_eq!(balance.closing, dec!(1000));
        }
    }

    #[test]
    fn test_gap_movement_rebases_baseline() {
        let ledger = InMemoryLedger::new()
            .with_snapshot(snapshot(
                date(2023, 10, 31),
                vec![SnapshotBalance::new("Cash - TC", dec!(1000), dec!(0))],
            ))
            .with_entry(GlEntry::debit("TC", "Cash - TC", date(2023, 10, 31), dec!(7)))
            .with_entry(GlEntry::debit("TC", "Cash - TC", date(2023, 11, 15), dec!(300)))
            .with_entry(GlEntry::debit("TC", "Petty Cash - TC", date(2023, 12, 20), dec!(40)));

        let ctx = ctx(ReportSettings::default());
        let periods = quarter_periods();
        let petty = AccountId::new("Petty Cash - TC");
        let data = BalanceProcessor::new(&ctx, &periods, &ledger, &ledger)
            .fetch_all_balances(&[cash(), petty.clone()])
            .unwrap();

        assert_eq!(data.get(&cash(), "jan").unwrap().opening, dec!(1300));
        // Gap movement counts even without a snapshot balance.
        assert_eq!(data.get(&petty, "jan").unwrap().opening, dec!(40));
    }

    #[test]
    fn test_adjacent_snapshot_needs_no_rebase() {
        let ledger = InMemoryLedger::new().with_snapshot(snapshot(
            date(2023, 12, 31),
            vec![SnapshotBalance::new("Cash - TC", dec!(500), dec!(0))],
        ));

        let ctx = ctx(ReportSettings::default());
        let periods = quarter_periods();
        let data = BalanceProcessor::new(&ctx, &periods, &ledger, &ledger)
            .fetch_all_balances(&[cash()])
            .unwrap();
        assert_eq!(data.get(&cash(), "jan").unwrap().opening, dec!(500));
    }

    #[test]
    fn test_ignore_closing_balance_setting() {
        let ledger = InMemoryLedger::new()
            .with_snapshot(snapshot(
                date(2023, 12, 31),
                vec![SnapshotBalance::new("Cash - TC", dec!(1000), dec!(0))],
            ))
            .with_entry(GlEntry::debit("TC", "Cash - TC", date(2024, 2, 10), dec!(10)));

        let ctx = ctx(ReportSettings {
            ignore_account_closing_balance: true,
            ..ReportSettings::default()
        });
        let periods = quarter_periods();
        let data = BalanceProcessor::new(&ctx, &periods, &ledger, &ledger)
            .fetch_all_balances(&[cash()])
            .unwrap();

        assert_eq!(data.get(&cash(), "jan").unwrap().opening, dec!(0));
        assert_eq!(data.get(&cash(), "mar").unwrap().opening, dec!(10));
    }

    fn in_book(balance: SnapshotBalance, book: &str) -> SnapshotBalance {
        SnapshotBalance {
            finance_book: Some(book.to_string()),
            ..balance
        }
    }

    fn tagged(balance: SnapshotBalance, tags: DimensionTags) -> SnapshotBalance {
        SnapshotBalance {
            dimensions: tags,
            ..balance
        }
    }

    /// Snapshot closed two months before January, so gap postings rebase it.
    fn booked_ledger() -> InMemoryLedger {
        let mut ledger = InMemoryLedger::new();
        ledger.push_snapshot(snapshot(
            date(2023, 10, 31),
            vec![
                SnapshotBalance::new("Cash - TC", dec!(1000), dec!(0)),
                in_book(SnapshotBalance::new("Cash - TC", dec!(200), dec!(0)), "Tax"),
                in_book(SnapshotBalance::new("Cash - TC", dec!(50), dec!(0)), "IFRS"),
                SnapshotBalance {
                    is_period_closing_entry: true,
                    ..SnapshotBalance::new("Cash - TC", dec!(30), dec!(0))
                },
            ],
        ));
        ledger.push_entry(GlEntry::debit("TC", "Cash - TC", date(2023, 11, 15), dec!(100)));
        ledger.push_entry(
            GlEntry::debit("TC", "Cash - TC", date(2023, 12, 1), dec!(20)).in_book("Tax"),
        );
        ledger.push_entry(
            GlEntry::debit("TC", "Cash - TC", date(2023, 12, 2), dec!(5)).in_book("IFRS"),
        );
        ledger.push_entry(
            GlEntry::debit("TC", "Cash - TC", date(2023, 12, 31), dec!(3)).period_closing(),
        );
        ledger
    }

    #[rstest]
    #[case::book_less_only(None, false, None, dec!(1133))]
    #[case::requested_book(Some("Tax"), false, None, dec!(1353))]
    #[case::requested_book_without_closing(Some("Tax"), true, None, dec!(1320))]
    #[case::default_book_entries(None, false, Some("IFRS"), dec!(1188))]
    fn test_ledger_filter_restricts_snapshot_and_gap(
        #[case] finance_book: Option<&str>,
        #[case] ignore_closing_entries: bool,
        #[case] default_book: Option<&str>,
        #[case] expected: Decimal,
    ) {
        let ledger = booked_ledger();
        let mut filters = ReportFilters::new("TC");
        filters.finance_book = finance_book.map(str::to_string);
        filters.include_default_book_entries = default_book.is_some();
        filters.ignore_closing_entries = ignore_closing_entries;
        let ctx = ReportContext::new(
            filters,
            ReportSettings::default(),
            default_book.map(str::to_string),
        )
        .unwrap();

        let periods = quarter_periods();
        let data = BalanceProcessor::new(&ctx, &periods, &ledger, &ledger)
            .fetch_all_balances(&[cash()])
            .unwrap();
        assert_eq!(data.get(&cash(), "jan").unwrap().opening, expected);
    }

    fn tagged_ledger() -> InMemoryLedger {
        let main = DimensionTags::new().with_cost_center("Main");
        let mut ledger = InMemoryLedger::new();
        ledger.push_snapshot(snapshot(
            date(2023, 10, 31),
            vec![
                tagged(SnapshotBalance::new("Cash - TC", dec!(1000), dec!(0)), main.clone()),
                tagged(
                    SnapshotBalance::new("Cash - TC", dec!(400), dec!(0)),
                    DimensionTags::new().with_cost_center("Branch"),
                ),
                SnapshotBalance::new("Cash - TC", dec!(70), dec!(0)),
                tagged(
                    SnapshotBalance::new("Cash - TC", dec!(25), dec!(0)),
                    main.clone().with_project("P1"),
                ),
                tagged(
                    SnapshotBalance::new("Cash - TC", dec!(8), dec!(0)),
                    DimensionTags::new().with_dimension("region", "North"),
                ),
            ],
        ));
        ledger.push_entry(
            GlEntry::debit("TC", "Cash - TC", date(2023, 11, 15), dec!(60)).tagged(main.clone()),
        );
        ledger.push_entry(
            GlEntry::debit("TC", "Cash - TC", date(2023, 11, 20), dec!(90))
                .tagged(DimensionTags::new().with_cost_center("Branch")),
        );
        ledger.push_entry(
            GlEntry::debit("TC", "Cash - TC", date(2023, 12, 5), dec!(11))
                .tagged(main.with_project("P2")),
        );
        ledger.push_entry(
            GlEntry::debit("TC", "Cash - TC", date(2023, 12, 6), dec!(2))
                .tagged(DimensionTags::new().with_dimension("region", "North")),
        );
        ledger
    }

    #[rstest]
    #[case::unfiltered(DimensionFilter::new(), dec!(1666))]
    #[case::cost_center(DimensionFilter::new().with_cost_center("Main"), dec!(1096))]
    #[case::cost_center_and_project(
        DimensionFilter::new().with_cost_center("Main").with_project("P1"),
        dec!(25)
    )]
    #[case::accounting_dimension(
        DimensionFilter::new().with_dimension("region", "North"),
        dec!(10)
    )]
    fn test_dimension_filter_restricts_snapshot_and_gap(
        #[case] dimensions: DimensionFilter,
        #[case] expected: Decimal,
    ) {
        let ledger = tagged_ledger();
        let mut filters = ReportFilters::new("TC");
        filters.dimensions = dimensions;
        let ctx = ReportContext::new(filters, ReportSettings::default(), None).unwrap();

        let periods = quarter_periods();
        let data = BalanceProcessor::new(&ctx, &periods, &ledger, &ledger)
            .fetch_all_balances(&[cash()])
            .unwrap();
        assert_eq!(data.get(&cash(), "jan").unwrap().opening, expected);
    }

    #[test]
    fn test_accounts_without_data_are_absent() {
        let ledger = InMemoryLedger::new();
        let ctx = ctx(ReportSettings::default());
        let periods = quarter_periods();
        let data = BalanceProcessor::new(&ctx, &periods, &ledger, &ledger)
            .fetch_all_balances(&[cash()])
            .unwrap();
        assert!(data.is_empty());
        assert!(!data.contains_account(&cash()));
    }

    #[test]
    fn test_calculate_totals() {
        let ledger = InMemoryLedger::new()
            .with_entry(GlEntry::credit("TC", "Sales - TC", date(2024, 1, 3), dec!(100)))
            .with_entry(GlEntry::credit("TC", "Service - TC", date(2024, 2, 3), dec!(40)));

        let ctx = ctx(ReportSettings::default());
        let periods = quarter_periods();
        let processor = BalanceProcessor::new(&ctx, &periods, &ledger, &ledger);
        let accounts = vec![
            AccountId::new("Service - TC"),
            AccountId::new("Sales - TC"),
            AccountId::new("Unused - TC"),
        ];
        let data = processor.fetch_all_balances(&accounts).unwrap();

        let movement = DataRequest::new(
            Some("INC".into()),
            accounts.clone(),
            DataSource::PeriodMovement,
        );
        assert_eq!(movement.accounts[0].as_str(), "Sales - TC");
        assert_eq!(
            processor.calculate_totals(&movement, &data),
            vec![dec!(-100), dec!(-40), dec!(0)]
        );

        let closing = DataRequest::new(None, accounts, DataSource::ClosingBalance);
        assert_eq!(
            processor.calculate_totals(&closing, &data),
            vec![dec!(-100), dec!(-140), dec!(-140)]
        );
    }

    #[test]
    fn test_data_source_serde_names() {
        let source: DataSource = serde_json::from_str(r#""Closing Balance""#).unwrap();
        assert_eq!(source, DataSource::ClosingBalance);
        let source: DataSource = serde_json::from_str(r#""Period Movement""#).unwrap();
        assert_eq!(source, DataSource::PeriodMovement);
    }
}
