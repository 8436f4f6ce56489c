//! Ledger record types.

use chrono::NaiveDate;
use finstat_shared::types::{AccountId, CompanyId, SnapshotId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::dimension::DimensionTags;

/// A single general ledger posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlEntry {
    /// Company the posting belongs to.
    pub company: CompanyId,
    /// Account affected by the posting.
    pub account: AccountId,
    /// Posting date.
    pub posting_date: NaiveDate,
    /// Debit amount in company currency.
    #[serde(default)]
    pub debit: Decimal,
    /// Credit amount in company currency.
    #[serde(default)]
    pub credit: Decimal,
    /// Finance book; `None` belongs to every book.
    #[serde(default)]
    pub finance_book: Option<String>,
    /// Opening entry flag.
    #[serde(default)]
    pub is_opening: bool,
    /// Posted by a period closing voucher.
    #[serde(default)]
    pub is_period_closing_entry: bool,
    /// Cancelled postings never count.
    #[serde(default)]
    pub is_cancelled: bool,
    /// Dimension tags.
    #[serde(default)]
    pub dimensions: DimensionTags,
}

impl GlEntry {
    /// Creates a debit posting.
    #[must_use]
    pub fn debit(
        company: impl Into<CompanyId>,
        account: impl Into<AccountId>,
        posting_date: NaiveDate,
        amount: Decimal,
    ) -> Self {
        Self {
            company: company.into(),
            account: account.into(),
            posting_date,
            debit: amount,
            credit: Decimal::ZERO,
            finance_book: None,
            is_opening: false,
            is_period_closing_entry: false,
            is_cancelled: false,
            dimensions: DimensionTags::default(),
        }
    }

    /// Creates a credit posting.
    #[must_use]
    pub fn credit(
        company: impl Into<CompanyId>,
        account: impl Into<AccountId>,
        posting_date: NaiveDate,
        amount: Decimal,
    ) -> Self {
        Self {
            debit: Decimal::ZERO,
            credit: amount,
            ..Self::debit(company, account, posting_date, Decimal::ZERO)
        }
    }

    /// Marks the posting as an opening entry.
    #[must_use]
    pub const fn opening(mut self) -> Self {
        self.is_opening = true;
        self
    }

    /// Marks the posting as a period closing entry.
    #[must_use]
    pub const fn period_closing(mut self) -> Self {
        self.is_period_closing_entry = true;
        self
    }

    /// Marks the posting as cancelled.
    #[must_use]
    pub const fn cancelled(mut self) -> Self {
        self.is_cancelled = true;
        self
    }

    /// Sets the finance book.
    #[must_use]
    pub fn in_book(mut self, finance_book: impl Into<String>) -> Self {
        self.finance_book = Some(finance_book.into());
        self
    }

    /// Sets the dimension tags.
    #[must_use]
    pub fn tagged(mut self, dimensions: DimensionTags) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Returns the signed amount (debit minus credit).
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        self.debit - self.credit
    }
}

/// Balance of one account captured by a closing snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotBalance {
    /// Account.
    pub account: AccountId,
    /// Accumulated debit.
    #[serde(default)]
    pub debit: Decimal,
    /// Accumulated credit.
    #[serde(default)]
    pub credit: Decimal,
    /// Finance book the balance was captured for.
    #[serde(default)]
    pub finance_book: Option<String>,
    /// Balance stems from period closing entries.
    #[serde(default)]
    pub is_period_closing_entry: bool,
    /// Dimension tags.
    #[serde(default)]
    pub dimensions: DimensionTags,
}

impl SnapshotBalance {
    /// Creates an untagged balance row.
    #[must_use]
    pub fn new(account: impl Into<AccountId>, debit: Decimal, credit: Decimal) -> Self {
        Self {
            account: account.into(),
            debit,
            credit,
            finance_book: None,
            is_period_closing_entry: false,
            dimensions: DimensionTags::default(),
        }
    }

    /// Returns the signed balance (debit minus credit).
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        self.debit - self.credit
    }
}

/// Persisted account balances as of a period end date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosingSnapshot {
    /// Snapshot identifier.
    pub name: SnapshotId,
    /// Company.
    pub company: CompanyId,
    /// Date the balances are valid at (inclusive).
    pub period_end_date: NaiveDate,
    /// Only finalized snapshots are used for reporting.
    #[serde(default)]
    pub finalized: bool,
    /// Captured balances.
    #[serde(default)]
    pub balances: Vec<SnapshotBalance>,
}
