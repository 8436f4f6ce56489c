//! Per-run report context and the ledger filter derived from it.

use finstat_shared::ReportSettings;
use finstat_shared::types::CompanyId;
use serde::{Deserialize, Serialize};

use super::entry::{GlEntry, SnapshotBalance};
use super::error::LedgerError;
use crate::dimension::{DimensionFilter, DimensionTags};

/// User-supplied filters for one report run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFilters {
    /// Company to report on.
    pub company: CompanyId,
    /// Finance book to report on; `None` reports the book-less entries.
    #[serde(default)]
    pub finance_book: Option<String>,
    /// Also include entries of the company's default finance book.
    #[serde(default)]
    pub include_default_book_entries: bool,
    /// Exclude entries posted by period closing vouchers.
    #[serde(default)]
    pub ignore_closing_entries: bool,
    /// Dimension restrictions.
    #[serde(default)]
    pub dimensions: DimensionFilter,
    /// Show period-movement rows as running totals.
    #[serde(default)]
    pub accumulated_values: bool,
}

impl ReportFilters {
    /// Creates filters for a company with everything else defaulted.
    #[must_use]
    pub fn new(company: impl Into<CompanyId>) -> Self {
        Self {
            company: company.into(),
            finance_book: None,
            include_default_book_entries: false,
            ignore_closing_entries: false,
            dimensions: DimensionFilter::default(),
            accumulated_values: false,
        }
    }
}

/// Everything a report run needs to know besides the template and periods.
///
/// Built once per run and passed explicitly to every component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportContext {
    /// Run filters.
    pub filters: ReportFilters,
    /// Accounting settings.
    pub settings: ReportSettings,
    /// The company's default finance book.
    pub default_finance_book: Option<String>,
}

impl ReportContext {
    /// Builds a context, rejecting contradictory finance-book selections.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::FinanceBookConflict`] when a finance book other
    /// than the company default is requested together with the default
    /// book's entries.
    pub fn new(
        filters: ReportFilters,
        settings: ReportSettings,
        default_finance_book: Option<String>,
    ) -> Result<Self, LedgerError> {
        let requested = non_empty(filters.finance_book.as_deref());
        let default = non_empty(default_finance_book.as_deref());
        if filters.include_default_book_entries
            && let (Some(requested), Some(default)) = (requested, default)
            && requested != default
        {
            return Err(LedgerError::FinanceBookConflict {
                requested: requested.to_string(),
                default: default.to_string(),
            });
        }

        Ok(Self {
            filters,
            settings,
            default_finance_book,
        })
    }

    /// The company being reported on.
    #[must_use]
    pub fn company(&self) -> &CompanyId {
        &self.filters.company
    }

    /// Derives the row filter applied to ledger and snapshot queries.
    #[must_use]
    pub fn ledger_filter(&self) -> LedgerFilter {
        let mut finance_books = Vec::new();
        if let Some(book) = non_empty(self.filters.finance_book.as_deref()) {
            finance_books.push(book.to_string());
        }
        if self.filters.include_default_book_entries
            && let Some(book) = non_empty(self.default_finance_book.as_deref())
            && !finance_books.iter().any(|b| b == book)
        {
            finance_books.push(book.to_string());
        }

        LedgerFilter {
            company: self.filters.company.clone(),
            exclude_opening: !self.settings.ignore_is_opening_check_for_reporting,
            exclude_closing_entries: self.filters.ignore_closing_entries,
            finance_books,
            dimensions: self.filters.dimensions.clone(),
        }
    }
}

/// Row-level restrictions shared by every ledger query of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerFilter {
    /// Company.
    pub company: CompanyId,
    /// Drop opening entries.
    pub exclude_opening: bool,
    /// Drop period closing entries.
    pub exclude_closing_entries: bool,
    /// Finance books accepted besides the empty book.
    pub finance_books: Vec<String>,
    /// Dimension restrictions.
    pub dimensions: DimensionFilter,
}

impl LedgerFilter {
    /// Returns true if a ledger posting counts for the run.
    #[must_use]
    pub fn matches_entry(&self, entry: &GlEntry) -> bool {
        entry.company == self.company
            && !entry.is_cancelled
            && !(self.exclude_opening && entry.is_opening)
            && self.matches_row(
                entry.is_period_closing_entry,
                entry.finance_book.as_deref(),
                &entry.dimensions,
            )
    }

    /// Returns true if a snapshot balance row counts for the run.
    #[must_use]
    pub fn matches_snapshot_balance(&self, balance: &SnapshotBalance) -> bool {
        self.matches_row(
            balance.is_period_closing_entry,
            balance.finance_book.as_deref(),
            &balance.dimensions,
        )
    }

    /// Returns true if the finance book is accepted.
    #[must_use]
    pub fn accepts_finance_book(&self, finance_book: Option<&str>) -> bool {
        match non_empty(finance_book) {
            None => true,
            Some(book) => self.finance_books.iter().any(|b| b == book),
        }
    }

    fn matches_row(
        &self,
        is_period_closing_entry: bool,
        finance_book: Option<&str>,
        dimensions: &DimensionTags,
    ) -> bool {
        !(self.exclude_closing_entries && is_period_closing_entry)
            && self.accepts_finance_book(finance_book)
            && self.dimensions.matches(dimensions)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn entry() -> GlEntry {
        GlEntry::debit(
            "TC",
            "Cash - TC",
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            dec!(10),
        )
    }

    fn context(filters: ReportFilters, default_book: Option<&str>) -> ReportContext {
        ReportContext::new(
            filters,
            ReportSettings::default(),
            default_book.map(str::to_string),
        )
        .unwrap()
    }

    #[test]
    fn test_finance_book_conflict() {
        let mut filters = ReportFilters::new("TC");
        filters.finance_book = Some("Tax Book".to_string());
        filters.include_default_book_entries = true;

        let err = ReportContext::new(
            filters.clone(),
            ReportSettings::default(),
            Some("Primary".to_string()),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::FinanceBookConflict { .. }));

        // Requesting the default book itself is fine.
        filters.finance_book = Some("Primary".to_string());
        assert!(
            ReportContext::new(filters, ReportSettings::default(), Some("Primary".to_string()))
                .is_ok()
        );
    }

    #[test]
    fn test_finance_book_rule() {
        let mut filters = ReportFilters::new("TC");
        filters.finance_book = Some("Tax Book".to_string());
        let filter = context(filters.clone(), Some("Primary")).ledger_filter();
        assert!(filter.accepts_finance_book(None));
        assert!(filter.accepts_finance_book(Some("")));
        assert!(filter.accepts_finance_book(Some("Tax Book")));
        assert!(!filter.accepts_finance_book(Some("Primary")));

        filters.finance_book = None;
        filters.include_default_book_entries = true;
        let filter = context(filters, Some("Primary")).ledger_filter();
        assert!(filter.accepts_finance_book(Some("Primary")));
        assert!(!filter.accepts_finance_book(Some("Tax Book")));
    }

    #[test]
    fn test_opening_and_cancelled_entries_excluded() {
        let filter = context(ReportFilters::new("TC"), None).ledger_filter();
        assert!(filter.matches_entry(&entry()));
        assert!(!filter.matches_entry(&entry().opening()));
        assert!(!filter.matches_entry(&entry().cancelled()));

        let settings = ReportSettings {
            ignore_is_opening_check_for_reporting: true,
            ..ReportSettings::default()
        };
        let filter = ReportContext::new(ReportFilters::new("TC"), settings, None)
            .unwrap()
            .ledger_filter();
        assert!(filter.matches_entry(&entry().opening()));
    }

    #[test]
    fn test_closing_entries_excluded_on_request() {
        let mut filters = ReportFilters::new("TC");
        let closing = entry().period_closing();
        assert!(context(filters.clone(), None).ledger_filter().matches_entry(&closing));

        filters.ignore_closing_entries = true;
        assert!(!context(filters, None).ledger_filter().matches_entry(&closing));
    }

    #[test]
    fn test_other_company_excluded() {
        let filter = context(ReportFilters::new("Other"), None).ledger_filter();
        assert!(!filter.matches_entry(&entry()));
    }

    #[test]
    fn test_dimension_filter_applied() {
        let mut filters = ReportFilters::new("TC");
        filters.dimensions = DimensionFilter::new().with_cost_center("Main - TC");
        let filter = context(filters, None).ledger_filter();

        assert!(!filter.matches_entry(&entry()));
        assert!(filter.matches_entry(
            &entry().tagged(DimensionTags::new().with_cost_center("Main - TC"))
        ));
    }
}
