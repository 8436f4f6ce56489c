//! Report templates and their rows.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::dependency::DependencyResolver;
use super::error::{ReportError, ValidationError};
use crate::filter::FilterExpressionParser;
use crate::ledger::DataSource;

/// Kind of statement a template produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportType {
    /// Income and expense over time.
    #[serde(rename = "Profit and Loss Statement")]
    ProfitAndLoss,
    /// Assets, liabilities and equity at period ends.
    #[serde(rename = "Balance Sheet")]
    BalanceSheet,
    /// Cash movement over time.
    #[serde(rename = "Cash Flow")]
    CashFlow,
    /// Any other layout.
    #[serde(rename = "Custom Financial Statement")]
    Custom,
}

/// How a row obtains its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RowType {
    /// Aggregates the balances of the accounts matched by a filter.
    #[serde(rename = "Account Data")]
    AccountData,
    /// Combines other rows with an arithmetic formula.
    #[serde(rename = "Formula/Calculation", alias = "Calculated Amount")]
    FormulaCalculation,
    /// Label-only heading.
    #[serde(rename = "Section Break")]
    SectionBreak,
    /// Empty spacer.
    #[serde(rename = "Spacing", alias = "Blank Line")]
    Spacing,
}

impl RowType {
    /// Returns true if rows of this type produce a value series.
    #[must_use]
    pub const fn has_values(self) -> bool {
        matches!(self, Self::AccountData | Self::FormulaCalculation)
    }
}

/// A row of a report template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    /// Code other rows' formulas use to refer to this row.
    #[serde(default)]
    pub reference_code: Option<String>,
    /// Display label.
    #[serde(default, alias = "display_name")]
    pub label: String,
    /// Row type.
    pub row_type: RowType,
    /// Balance component for account data rows.
    #[serde(default)]
    pub data_source: Option<DataSource>,
    /// Account filter for account data rows, arithmetic formula for
    /// calculation rows.
    #[serde(default)]
    pub calculation_formula: Option<String>,
    /// Indentation level.
    #[serde(default, alias = "indentation_level")]
    pub indent: u8,
    /// Bold text.
    #[serde(default, alias = "bold_text")]
    pub bold: bool,
    /// Italic text.
    #[serde(default, alias = "italic_text")]
    pub italic: bool,
    /// Negate the row's values.
    #[serde(default)]
    pub reverse_sign: bool,
    /// Hide the row when every value is zero.
    #[serde(default)]
    pub hide_if_zero: bool,
}

impl ReportRow {
    fn new(row_type: RowType, label: impl Into<String>) -> Self {
        Self {
            reference_code: None,
            label: label.into(),
            row_type,
            data_source: None,
            calculation_formula: None,
            indent: 0,
            bold: false,
            italic: false,
            reverse_sign: false,
            hide_if_zero: false,
        }
    }

    /// Creates an account data row.
    #[must_use]
    pub fn account_data(
        reference_code: impl Into<String>,
        label: impl Into<String>,
        filter: impl Into<String>,
        data_source: DataSource,
    ) -> Self {
        Self {
            reference_code: Some(reference_code.into()),
            data_source: Some(data_source),
            calculation_formula: Some(filter.into()),
            ..Self::new(RowType::AccountData, label)
        }
    }

    /// Creates a formula row.
    #[must_use]
    pub fn formula(
        reference_code: impl Into<String>,
        label: impl Into<String>,
        formula: impl Into<String>,
    ) -> Self {
        Self {
            reference_code: Some(reference_code.into()),
            calculation_formula: Some(formula.into()),
            ..Self::new(RowType::FormulaCalculation, label)
        }
    }

    /// Creates a heading row.
    #[must_use]
    pub fn section(label: impl Into<String>) -> Self {
        Self {
            bold: true,
            ..Self::new(RowType::SectionBreak, label)
        }
    }

    /// Creates a spacer row.
    #[must_use]
    pub fn spacing() -> Self {
        Self::new(RowType::Spacing, "")
    }

    /// Sets the reverse sign flag.
    #[must_use]
    pub const fn reversed(mut self) -> Self {
        self.reverse_sign = true;
        self
    }

    /// Sets the hide-if-zero flag.
    #[must_use]
    pub const fn hidden_if_zero(mut self) -> Self {
        self.hide_if_zero = true;
        self
    }

    /// Sets the indentation level.
    #[must_use]
    pub const fn indented(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }

    /// Returns the trimmed filter or formula, if not blank.
    #[must_use]
    pub fn expression(&self) -> Option<&str> {
        self.calculation_formula
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
    }
}

/// Returns true if `code` matches `[A-Za-z_][A-Za-z0-9_-]*`.
#[must_use]
pub fn is_valid_reference_code(code: &str) -> bool {
    let mut chars = code.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// A named, ordered list of report rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTemplate {
    /// Template name.
    pub name: String,
    /// Statement kind.
    pub report_type: ReportType,
    /// Disabled templates cannot be run.
    #[serde(default)]
    pub disabled: bool,
    /// Rows in display order.
    #[serde(default)]
    pub rows: Vec<ReportRow>,
}

impl ReportTemplate {
    /// Creates an empty template.
    #[must_use]
    pub fn new(name: impl Into<String>, report_type: ReportType) -> Self {
        Self {
            name: name.into(),
            report_type,
            disabled: false,
            rows: Vec::new(),
        }
    }

    /// Appends a row.
    #[must_use]
    pub fn with_row(mut self, row: ReportRow) -> Self {
        self.rows.push(row);
        self
    }

    /// Checks the template before it is saved.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::InvalidTemplate`] with every problem found.
    pub fn validate(&self) -> Result<(), ReportError> {
        let errors = self.validation_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ReportError::InvalidTemplate(errors))
        }
    }

    /// Returns every problem that would reject a save, in row order.
    #[must_use]
    pub fn validation_errors(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for (index, row) in self.rows.iter().enumerate() {
            let number = index + 1;

            if let Some(code) = row.reference_code.as_deref() {
                if !is_valid_reference_code(code) {
                    errors.push(ValidationError::InvalidReferenceCode(code.to_string()));
                }
                if !seen.insert(code) {
                    errors.push(ValidationError::DuplicateReferenceCode(code.to_string()));
                }
            }

            match row.row_type {
                RowType::AccountData => {
                    if row.data_source.is_none() {
                        errors.push(ValidationError::MissingDataSource { row: number });
                    }
                    match row.expression() {
                        None => errors.push(ValidationError::MissingFilter { row: number }),
                        Some(filter) => {
                            if let Err(source) = FilterExpressionParser::validate(filter) {
                                errors.push(ValidationError::InvalidFilter {
                                    row: number,
                                    source,
                                });
                            }
                        }
                    }
                }
                RowType::FormulaCalculation => {
                    if row.expression().is_none() {
                        errors.push(ValidationError::MissingFormula { row: number });
                    }
                }
                RowType::SectionBreak | RowType::Spacing => {}
            }
        }

        let resolver = DependencyResolver::new(&self.rows);
        errors.extend(
            resolver
                .formula_errors()
                .iter()
                .map(|(index, source)| ValidationError::InvalidFormula {
                    row: index + 1,
                    source: source.clone(),
                }),
        );
        errors.extend(
            resolver
                .unknown_references()
                .into_iter()
                .map(|(index, reference)| ValidationError::UnknownReference {
                    row: index + 1,
                    reference,
                }),
        );
        if let Err(err) = resolver.detect_cycles() {
            errors.push(err);
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn income() -> ReportRow {
        ReportRow::account_data(
            "INC",
            "Income",
            r#"["root_type", "=", "Income"]"#,
            DataSource::PeriodMovement,
        )
    }

    #[rstest]
    #[case("INC001", true)]
    #[case("_net", true)]
    #[case("GROSS-PROFIT", true)]
    #[case("1ST", false)]
    #[case("-A", false)]
    #[case("A B", false)]
    #[case("", false)]
    fn test_reference_code_pattern(#[case] code: &str, #[case] valid: bool) {
        assert_eq!(is_valid_reference_code(code), valid);
    }

    #[test]
    fn test_valid_template() {
        let template = ReportTemplate::new("P&L", ReportType::ProfitAndLoss)
            .with_row(ReportRow::section("Income"))
            .with_row(income())
            .with_row(ReportRow::spacing())
            .with_row(ReportRow::formula("NET", "Net", "INC * -1"));
        assert!(template.validate().is_ok());
    }

    #[test]
    fn test_collects_every_problem() {
        let mut missing_source = income();
        missing_source.reference_code = Some("INC".to_string());
        missing_source.data_source = None;

        let template = ReportTemplate::new("Broken", ReportType::Custom)
            .with_row(income())
            .with_row(missing_source)
            .with_row(ReportRow::account_data(
                "9X",
                "Bad",
                r#"["lft", ">", 3]"#,
                DataSource::ClosingBalance,
            ))
            .with_row(ReportRow::formula("EMPTY", "Empty", "  "))
            .with_row(ReportRow::formula("NET", "Net", "INC - MISSING"))
            .with_row(ReportRow::formula("BAD", "Bad", "INC +"));

        let errors = template.validation_errors();
        assert!(errors.contains(&ValidationError::DuplicateReferenceCode("INC".to_string())));
        assert!(errors.contains(&ValidationError::MissingDataSource { row: 2 }));
        assert!(errors.contains(&ValidationError::InvalidReferenceCode("9X".to_string())));
        assert!(errors.contains(&ValidationError::InvalidFilter {
            row: 3,
            source: crate::filter::FilterError::UnknownField("lft".to_string()),
        }));
        assert!(errors.contains(&ValidationError::MissingFormula { row: 4 }));
        assert!(errors.contains(&ValidationError::UnknownReference {
            row: 5,
            reference: "MISSING".to_string(),
        }));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidFormula { row: 6, .. })));

        let err = template.validate().unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_self_and_circular_references() {
        let template = ReportTemplate::new("Loop", ReportType::Custom)
            .with_row(ReportRow::formula("A", "A", "A + 1"));
        assert_eq!(
            template.validation_errors(),
            vec![ValidationError::SelfReference("A".to_string())]
        );

        let template = ReportTemplate::new("Cycle", ReportType::Custom)
            .with_row(ReportRow::formula("A", "A", "B + 1"))
            .with_row(ReportRow::formula("B", "B", "A + 1"));
        assert!(matches!(
            template.validation_errors().as_slice(),
            [ValidationError::CircularReference { .. }]
        ));
    }

    #[test]
    fn test_deserialize_template() {
        let json = r#"{
            "name": "Profit and Loss",
            "report_type": "Profit and Loss Statement",
            "rows": [
                {"reference_code": "INC", "display_name": "Income", "row_type": "Account Data",
                 "data_source": "Period Movement (Debit - Credit)",
                 "calculation_formula": "[\"root_type\", \"=\", \"Income\"]",
                 "reverse_sign": true, "bold_text": true},
                {"row_type": "Blank Line"},
                {"reference_code": "NET", "label": "Net", "row_type": "Formula/Calculation",
                 "calculation_formula": "INC", "indentation_level": 1}
            ]
        }"#;
        let template: ReportTemplate = serde_json::from_str(json).unwrap();
        assert_eq!(template.rows.len(), 3);
        assert_eq!(template.rows[0].label, "Income");
        assert!(template.rows[0].bold && template.rows[0].reverse_sign);
        assert_eq!(template.rows[1].row_type, RowType::Spacing);
        assert_eq!(template.rows[2].indent, 1);
        assert!(!template.disabled);
        assert!(template.validate().is_ok());
    }
}
