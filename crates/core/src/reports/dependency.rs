//! Processing order and reference checks for template rows.

use std::collections::{BTreeSet, HashMap, HashSet};

use super::error::{ConfigurationError, FormulaError, ReportError, ValidationError};
use super::formula::Expr;
use super::template::{ReportRow, RowType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    OnPath,
    Done,
}

/// Orders rows for computation and checks the formula reference graph.
pub struct DependencyResolver<'a> {
    rows: &'a [ReportRow],
    /// Referenced codes per row; `None` for rows without a parsed formula.
    references: Vec<Option<BTreeSet<String>>>,
    formula_errors: Vec<(usize, FormulaError)>,
    /// Formula row index per reference code.
    formula_rows: HashMap<&'a str, usize>,
}

impl<'a> DependencyResolver<'a> {
    /// Parses every formula of `rows`.
    #[must_use]
    pub fn new(rows: &'a [ReportRow]) -> Self {
        let known: HashSet<&str> = rows
            .iter()
            .filter_map(|r| r.reference_code.as_deref())
            .collect();

        let mut references = Vec::with_capacity(rows.len());
        let mut formula_errors = Vec::new();
        let mut formula_rows = HashMap::new();

        for (index, row) in rows.iter().enumerate() {
            if row.row_type != RowType::FormulaCalculation {
                references.push(None);
                continue;
            }
            if let Some(code) = row.reference_code.as_deref() {
                formula_rows.entry(code).or_insert(index);
            }
            let Some(formula) = row.expression() else {
                references.push(None);
                continue;
            };
            match Expr::parse(formula, &known) {
                Ok(expr) => references.push(Some(
                    expr.references().into_iter().map(str::to_string).collect(),
                )),
                Err(err) => {
                    formula_errors.push((index, err));
                    references.push(None);
                }
            }
        }

        Self {
            rows,
            references,
            formula_errors,
            formula_rows,
        }
    }

    /// Formulas that failed to parse, by row index.
    #[must_use]
    pub fn formula_errors(&self) -> &[(usize, FormulaError)] {
        &self.formula_errors
    }

    /// Codes referenced by the formula at `index`.
    #[must_use]
    pub fn references_of(&self, index: usize) -> Option<&BTreeSet<String>> {
        self.references.get(index)?.as_ref()
    }

    /// References to codes no account data or formula row defines, by row
    /// index.
    #[must_use]
    pub fn unknown_references(&self) -> Vec<(usize, String)> {
        let value_codes: HashSet<&str> = self
            .rows
            .iter()
            .filter(|r| r.row_type.has_values())
            .filter_map(|r| r.reference_code.as_deref())
            .collect();

        self.references
            .iter()
            .enumerate()
            .filter_map(|(index, refs)| Some((index, refs.as_ref()?)))
            .flat_map(|(index, refs)| {
                refs.iter()
                    .filter(|code| !value_codes.contains(code.as_str()))
                    .map(move |code| (index, code.clone()))
            })
            .collect()
    }

    /// Rejects formulas that reference their own row or form a cycle.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::SelfReference`] or
    /// [`ValidationError::CircularReference`] naming the colliding codes.
    pub fn detect_cycles(&self) -> Result<(), ValidationError> {
        for (index, row) in self.rows.iter().enumerate() {
            if let (Some(code), Some(refs)) =
                (row.reference_code.as_deref(), self.references_of(index))
                && refs.contains(code)
            {
                return Err(ValidationError::SelfReference(code.to_string()));
            }
        }

        let mut marks: HashMap<&str, Mark> = HashMap::new();
        for (index, row) in self.rows.iter().enumerate() {
            if let Some(code) = row.reference_code.as_deref()
                && self.formula_rows.get(code) == Some(&index)
                && !marks.contains_key(code)
            {
                self.visit(code, &mut marks)?;
            }
        }
        Ok(())
    }

    fn visit(
        &self,
        code: &'a str,
        marks: &mut HashMap<&'a str, Mark>,
    ) -> Result<(), ValidationError> {
        marks.insert(code, Mark::OnPath);
        for next in self.formula_dependencies(code) {
            match marks.get(next) {
                Some(Mark::OnPath) => {
                    return Err(ValidationError::CircularReference {
                        from: code.to_string(),
                        to: next.to_string(),
                    });
                }
                Some(Mark::Done) => {}
                None => self.visit(next, marks)?,
            }
        }
        marks.insert(code, Mark::Done);
        Ok(())
    }

    /// Codes of formula rows referenced by the formula row with `code`.
    fn formula_dependencies(&self, code: &str) -> Vec<&'a str> {
        let Some(&index) = self.formula_rows.get(code) else {
            return Vec::new();
        };
        self.formula_refs_at(index)
    }

    fn formula_refs_at(&self, index: usize) -> Vec<&'a str> {
        let Some(refs) = self.references_of(index) else {
            return Vec::new();
        };
        refs.iter()
            .filter_map(|r| self.formula_rows.get_key_value(r.as_str()).map(|(k, _)| *k))
            .collect()
    }

    /// Row indices in computation order: account data rows, then formula
    /// rows (each after the formula rows it references), then the rest.
    /// Each tier keeps template order where references allow.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unparseable formulas or unknown
    /// references and a validation error for self or circular references.
    pub fn processing_order(&self) -> Result<Vec<usize>, ReportError> {
        if let Some((index, source)) = self.formula_errors.first() {
            return Err(ConfigurationError::InvalidFormula {
                row: index + 1,
                source: source.clone(),
            }
            .into());
        }
        self.detect_cycles()?;
        if let Some((index, reference)) = self.unknown_references().into_iter().next() {
            return Err(ConfigurationError::UnknownReference {
                row: index + 1,
                reference,
            }
            .into());
        }

        let mut order: Vec<usize> = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.row_type == RowType::AccountData)
            .map(|(i, _)| i)
            .collect();

        let mut placed = vec![false; self.rows.len()];
        for (index, row) in self.rows.iter().enumerate() {
            if row.row_type == RowType::FormulaCalculation {
                self.place_formula(index, &mut placed, &mut order);
            }
        }

        order.extend(
            self.rows
                .iter()
                .enumerate()
                .filter(|(_, r)| !r.row_type.has_values())
                .map(|(i, _)| i),
        );
        Ok(order)
    }

    fn place_formula(&self, index: usize, placed: &mut [bool], order: &mut Vec<usize>) {
        if placed[index] {
            return;
        }
        placed[index] = true;
        for code in self.formula_refs_at(index) {
            if let Some(&dependency) = self.formula_rows.get(code) {
                self.place_formula(dependency, placed, order);
            }
        }
        order.push(index);
    }

    /// Rows in computation order.
    ///
    /// # Errors
    ///
    /// See [`Self::processing_order`].
    pub fn get_processing_order(&self) -> Result<Vec<&'a ReportRow>, ReportError> {
        Ok(self
            .processing_order()?
            .into_iter()
            .map(|index| &self.rows[index])
            .collect())
    }
}
