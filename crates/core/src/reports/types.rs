//! Report output types.

use rust_decimal::Decimal;
use serde::Serialize;

use super::template::{ReportType, RowType};
use crate::fiscal::Period;

/// A computed financial statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinancialReport {
    /// Template name.
    pub template: String,
    /// Statement kind.
    pub report_type: ReportType,
    /// Report columns.
    pub periods: Vec<Period>,
    /// Lines in template order.
    pub rows: Vec<ReportLine>,
}

impl FinancialReport {
    /// Finds the line with the given reference code.
    #[must_use]
    pub fn line(&self, reference_code: &str) -> Option<&ReportLine> {
        self.rows
            .iter()
            .find(|line| line.reference_code.as_deref() == Some(reference_code))
    }

    /// Lines that are not hidden.
    pub fn visible_rows(&self) -> impl Iterator<Item = &ReportLine> {
        self.rows.iter().filter(|line| !line.hidden)
    }
}

/// One line of a computed report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportLine {
    /// Row reference code.
    pub reference_code: Option<String>,
    /// Display label.
    pub label: String,
    /// Row type.
    pub row_type: RowType,
    /// Indentation level.
    pub indent: u8,
    /// Bold text.
    pub bold: bool,
    /// Italic text.
    pub italic: bool,
    /// Row is hidden because every value is zero.
    pub hidden: bool,
    /// One value per period; `None` for rows without values.
    pub values: Option<Vec<Decimal>>,
}
