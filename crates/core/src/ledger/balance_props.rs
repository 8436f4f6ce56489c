//! Property-based tests for BalanceProcessor.
//!
//! - Closing equals opening plus movement in every period
//! - Each period opens at the previous period's closing
//! - A snapshot balance with no movement carries through unchanged

use chrono::{Days, NaiveDate};
use finstat_shared::ReportSettings;
use finstat_shared::types::{AccountId, CompanyId, SnapshotId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::balance::BalanceProcessor;
use super::context::{ReportContext, ReportFilters};
use super::entry::{ClosingSnapshot, GlEntry, SnapshotBalance};
use super::memory::InMemoryLedger;
use crate::fiscal::{Periodicity, generate_periods};

const ACCOUNTS: [&str; 3] = ["Cash - TC", "Debtors - TC", "Sales - TC"];

/// Strategy to generate signed amounts (-10,000.00 to 10,000.00).
fn signed_amount() -> impl Strategy<Value = Decimal> {
    (-1_000_000i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate a posting within calendar year 2024.
fn posting() -> impl Strategy<Value = GlEntry> {
    (0usize..ACCOUNTS.len(), 0u64..366, signed_amount()).prop_map(|(account, day, amount)| {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .checked_add_days(Days::new(day))
            .unwrap();
        if amount.is_sign_negative() {
            GlEntry::credit("TC", ACCOUNTS[account], date, -amount)
        } else {
            GlEntry::debit("TC", ACCOUNTS[account], date, amount)
        }
    })
}

fn context() -> ReportContext {
    ReportContext::new(ReportFilters::new("TC"), ReportSettings::default(), None).unwrap()
}

fn accounts() -> Vec<AccountId> {
    ACCOUNTS.iter().copied().map(AccountId::new).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Closing = opening + movement, and opening[i+1] = closing[i].
    #[test]
    fn prop_running_balance_consistency(
        entries in prop::collection::vec(posting(), 0..40),
        baseline in signed_amount(),
    ) {
        let mut ledger = InMemoryLedger::new().with_snapshot(ClosingSnapshot {
            name: SnapshotId::new("PCV-2023"),
            company: CompanyId::new("TC"),
            period_end_date: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
            finalized: true,
            balances: vec![SnapshotBalance::new("Cash - TC", baseline, Decimal::ZERO)],
        });
        for entry in entries {
            ledger.push_entry(entry);
        }

        let ctx = context();
        let periods = generate_periods(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            Periodicity::Monthly,
        )
        .unwrap();
        let data = BalanceProcessor::new(&ctx, &periods, &ledger, &ledger)
            .fetch_all_balances(&accounts())
            .unwrap();

        for account in data.accounts() {
            let mut previous_closing: Option<Decimal> = None;
            for period in &periods {
                let balance = data.get(account, &period.key).unwrap();
                prop_assert_eq!(balance.closing, balance.opening + balance.movement);
                if let Some(closing) = previous_closing {
                    prop_assert_eq!(balance.opening, closing);
                }
                previous_closing = Some(balance.closing);
            }
        }
    }

    /// A snapshot balance with no later movement is the opening of every period.
    #[test]
    fn prop_snapshot_baseline_carries_forward(baseline in signed_amount()) {
        let ledger = InMemoryLedger::new().with_snapshot(ClosingSnapshot {
            name: SnapshotId::new("PCV-2023"),
            company: CompanyId::new("TC"),
            period_end_date: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
            finalized: true,
            balances: vec![SnapshotBalance::new("Cash - TC", baseline, Decimal::ZERO)],
        });

        let ctx = context();
        let periods = generate_periods(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            Periodicity::Quarterly,
        )
        .unwrap();
        let cash = AccountId::new("Cash - TC");
        let data = BalanceProcessor::new(&ctx, &periods, &ledger, &ledger)
            .fetch_all_balances(&[cash.clone()])
            .unwrap();

        for period in &periods {
            let balance = data.get(&cash, &period.key).unwrap();
            prop_assert_eq!(balance.opening, baseline);
            prop_assert_eq!(balance.closing, baseline);
        }
    }

    /// The final closing equals baseline plus every posting in range.
    #[test]
    fn prop_final_closing_matches_ledger_total(
        entries in prop::collection::vec(posting(), 1..40),
    ) {
        let expected: Decimal = entries
            .iter()
            .filter(|e| e.account.as_str() == "Debtors - TC")
            .map(GlEntry::signed_amount)
            .sum();
        let mut ledger = InMemoryLedger::new();
        for entry in entries {
            ledger.push_entry(entry);
        }

        let ctx = context();
        let periods = generate_periods(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            Periodicity::HalfYearly,
        )
        .unwrap();
        let debtors = AccountId::new("Debtors - TC");
        let data = BalanceProcessor::new(&ctx, &periods, &ledger, &ledger)
            .fetch_all_balances(&accounts())
            .unwrap();

        let closing = data
            .get(&debtors, &periods[periods.len() - 1].key)
            .map_or(Decimal::ZERO, |b| b.closing);
        prop_assert_eq!(closing, expected);
    }
}
