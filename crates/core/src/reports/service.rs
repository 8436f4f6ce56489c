//! Report generation service.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use tracing::{debug, info};

use super::collector::{LedgerSources, PeriodAccountDataCollector};
use super::dependency::DependencyResolver;
use super::error::{ConfigurationError, FormulaError, ReportError};
use super::formula::FormulaCalculator;
use super::store::TemplateSource;
use super::template::{ReportRow, ReportTemplate, RowType};
use super::types::{FinancialReport, ReportLine};
use crate::fiscal::Period;
use crate::ledger::{DataSource, ReportContext};

/// Computes financial statements from templates.
pub struct FinancialReportEngine<'a> {
    templates: &'a dyn TemplateSource,
    sources: LedgerSources<'a>,
}

impl<'a> FinancialReportEngine<'a> {
    /// Creates an engine over the given collaborators.
    #[must_use]
    pub fn new(templates: &'a dyn TemplateSource, sources: LedgerSources<'a>) -> Self {
        Self { templates, sources }
    }

    /// Loads the named template and computes it for `periods`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::TemplateNotFound`] or
    /// [`ReportError::TemplateDisabled`], then anything
    /// [`Self::generate_from_template`] returns.
    pub fn generate(
        &self,
        template_name: &str,
        ctx: &ReportContext,
        periods: &[Period],
    ) -> Result<FinancialReport, ReportError> {
        let template = self
            .templates
            .load_template(template_name)
            .ok_or_else(|| ReportError::TemplateNotFound(template_name.to_string()))?;
        if template.disabled {
            return Err(ReportError::TemplateDisabled(template.name));
        }
        self.generate_from_template(&template, ctx, periods)
    }

    /// Computes a template for `periods`.
    ///
    /// Account data rows are computed first in one batched balance fetch,
    /// then formula rows in dependency order. Lines come back in template
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::NoPeriods`] for an empty period list,
    /// [`ReportError::DuplicatePeriodKey`] when two periods share a key, a
    /// validation or configuration error for a broken formula graph,
    /// [`ReportError::Evaluation`] on arithmetic overflow and
    /// [`ReportError::Source`] when a collaborator fails.
    pub fn generate_from_template(
        &self,
        template: &ReportTemplate,
        ctx: &ReportContext,
        periods: &[Period],
    ) -> Result<FinancialReport, ReportError> {
        if periods.is_empty() {
            return Err(ReportError::NoPeriods);
        }
        let mut keys = HashSet::new();
        if let Some(period) = periods.iter().find(|p| !keys.insert(p.key.as_str())) {
            return Err(ReportError::DuplicatePeriodKey(period.key.clone()));
        }

        info!(
            template = %template.name,
            company = %ctx.company(),
            periods = periods.len(),
            rows = template.rows.len(),
            "Generating financial report"
        );

        let order = DependencyResolver::new(&template.rows).processing_order()?;
        let mut values: Vec<Option<Vec<Decimal>>> = vec![None; template.rows.len()];
        let mut by_code: HashMap<String, Vec<Decimal>> = HashMap::new();

        let mut collector = PeriodAccountDataCollector::new(ctx, periods, self.sources);
        let mut account_rows = Vec::new();
        for &index in &order {
            let row = &template.rows[index];
            if row.row_type == RowType::AccountData {
                collector.add_data_request(row)?;
                account_rows.push(index);
            }
        }
        for (index, mut series) in account_rows.into_iter().zip(collector.process_requests()?) {
            let row = &template.rows[index];
            if ctx.filters.accumulated_values
                && row.data_source == Some(DataSource::PeriodMovement)
            {
                accumulate(&mut series);
            }
            store(row, index, apply_sign(row, series), &mut values, &mut by_code);
        }

        for &index in &order {
            let row = &template.rows[index];
            if row.row_type != RowType::FormulaCalculation {
                continue;
            }
            let series = match row.expression() {
                Some(formula) => FormulaCalculator::new(&by_code, periods)
                    .evaluate_formula(formula)
                    .map_err(|source| formula_failure(index, source))?,
                None => vec![Decimal::ZERO; periods.len()],
            };
            store(row, index, apply_sign(row, series), &mut values, &mut by_code);
        }

        let rows: Vec<ReportLine> = template
            .rows
            .iter()
            .zip(values)
            .map(|(row, values)| line(row, values))
            .collect();

        debug!(
            template = %template.name,
            hidden = rows.iter().filter(|l| l.hidden).count(),
            "Financial report generated"
        );

        Ok(FinancialReport {
            template: template.name.clone(),
            report_type: template.report_type,
            periods: periods.to_vec(),
            rows,
        })
    }
}

fn accumulate(series: &mut [Decimal]) {
    let mut total = Decimal::ZERO;
    for value in series {
        total += *value;
        *value = total;
    }
}

fn apply_sign(row: &ReportRow, series: Vec<Decimal>) -> Vec<Decimal> {
    if row.reverse_sign {
        series.into_iter().map(|v| -v).collect()
    } else {
        series
    }
}

fn store(
    row: &ReportRow,
    index: usize,
    series: Vec<Decimal>,
    values: &mut [Option<Vec<Decimal>>],
    by_code: &mut HashMap<String, Vec<Decimal>>,
) {
    if let Some(code) = &row.reference_code {
        by_code.insert(code.clone(), series.clone());
    }
    values[index] = Some(series);
}

fn formula_failure(index: usize, source: FormulaError) -> ReportError {
    let row = index + 1;
    match source {
        FormulaError::UnknownReference(reference) => {
            ConfigurationError::UnknownReference { row, reference }.into()
        }
        FormulaError::Syntax { .. } => ConfigurationError::InvalidFormula { row, source }.into(),
        FormulaError::Overflow => ReportError::Evaluation { row, source },
    }
}

fn line(row: &ReportRow, values: Option<Vec<Decimal>>) -> ReportLine {
    let hidden = row.hide_if_zero
        && values
            .as_ref()
            .is_some_and(|series| series.iter().all(Decimal::is_zero));
    ReportLine {
        reference_code: row.reference_code.clone(),
        label: row.label.clone(),
        row_type: row.row_type,
        indent: row.indent,
        bold: row.bold,
        italic: row.italic,
        hidden,
        values,
    }
}
