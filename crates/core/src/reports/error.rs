//! Report error types.

use finstat_shared::AppError;
use thiserror::Error;

use crate::filter::FilterError;
use crate::ledger::LedgerError;

/// Errors raised while parsing or evaluating a row formula.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormulaError {
    /// The formula is not a well-formed arithmetic expression.
    #[error("Invalid formula syntax at offset {offset}: {message}")]
    Syntax {
        /// Byte offset of the offending input.
        offset: usize,
        /// What was expected.
        message: String,
    },

    /// The formula names a row that has no computed series.
    #[error("Unknown reference code: {0}")]
    UnknownReference(String),

    /// A result did not fit the decimal range.
    #[error("Arithmetic overflow")]
    Overflow,
}

impl FormulaError {
    pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            offset,
            message: message.into(),
        }
    }
}

/// Template problems that reject a save. Row numbers are 1-based.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Two rows share a reference code.
    #[error("Duplicate reference code: {0}")]
    DuplicateReferenceCode(String),

    /// Reference code does not match `[A-Za-z_][A-Za-z0-9_-]*`.
    #[error(
        "Invalid reference code '{0}': must start with a letter or underscore and contain \
         only letters, digits, underscores and hyphens"
    )]
    InvalidReferenceCode(String),

    /// Account data row without a data source.
    #[error("Row {row}: data source is required for account data rows")]
    MissingDataSource {
        /// Row number.
        row: usize,
    },

    /// Account data row without an account filter.
    #[error("Row {row}: account filter is required for account data rows")]
    MissingFilter {
        /// Row number.
        row: usize,
    },

    /// Formula row without a formula.
    #[error("Row {row}: formula is required for calculation rows")]
    MissingFormula {
        /// Row number.
        row: usize,
    },

    /// Account filter does not parse or uses unknown fields.
    #[error("Row {row}: {source}")]
    InvalidFilter {
        /// Row number.
        row: usize,
        /// Underlying problem.
        source: FilterError,
    },

    /// Formula does not parse.
    #[error("Row {row}: {source}")]
    InvalidFormula {
        /// Row number.
        row: usize,
        /// Underlying problem.
        source: FormulaError,
    },

    /// Formula names a code no value row defines.
    #[error("Row {row}: formula references unknown code {reference}")]
    UnknownReference {
        /// Row number.
        row: usize,
        /// The unknown code.
        reference: String,
    },

    /// Formula references its own row.
    #[error("Row {0} references itself")]
    SelfReference(String),

    /// Formulas reference each other in a cycle.
    #[error("Circular reference between {from} and {to}")]
    CircularReference {
        /// Row whose formula closes the cycle.
        from: String,
        /// Row already on the reference path.
        to: String,
    },
}

impl ValidationError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateReferenceCode(_) => "DUPLICATE_REFERENCE_CODE",
            Self::InvalidReferenceCode(_) => "INVALID_REFERENCE_CODE",
            Self::MissingDataSource { .. } => "MISSING_DATA_SOURCE",
            Self::MissingFilter { .. } => "MISSING_FILTER",
            Self::MissingFormula { .. } => "MISSING_FORMULA",
            Self::InvalidFilter { .. } => "INVALID_FILTER",
            Self::InvalidFormula { .. } => "INVALID_FORMULA",
            Self::UnknownReference { .. } => "UNKNOWN_REFERENCE",
            Self::SelfReference(_) => "SELF_REFERENCE",
            Self::CircularReference { .. } => "CIRCULAR_REFERENCE",
        }
    }
}

/// Template problems detected while running a report.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Formula names a code no value row defines.
    #[error("Row {row}: formula references unknown code {reference}")]
    UnknownReference {
        /// Row number (1-based).
        row: usize,
        /// The unknown code.
        reference: String,
    },

    /// Formula does not parse.
    #[error("Row {row}: {source}")]
    InvalidFormula {
        /// Row number (1-based).
        row: usize,
        /// Underlying problem.
        source: FormulaError,
    },
}

/// Errors that can occur during report generation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReportError {
    /// No template with the given name exists.
    #[error("Report template not found: {0}")]
    TemplateNotFound(String),

    /// The template is disabled.
    #[error("Report template {0} is disabled")]
    TemplateDisabled(String),

    /// The run has no periods.
    #[error("No periods to report on")]
    NoPeriods,

    /// Two periods of the run share a key.
    #[error("Duplicate period key: {0}")]
    DuplicatePeriodKey(String),

    /// Save-time validation found problems.
    #[error("Invalid report template: {}", summarize(.0))]
    InvalidTemplate(Vec<ValidationError>),

    /// Formula graph error that aborts a run.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Template misconfiguration detected at run time.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// A formula could not be evaluated.
    #[error("Row {row}: {source}")]
    Evaluation {
        /// Row number (1-based).
        row: usize,
        /// Underlying problem.
        source: FormulaError,
    },

    /// An external collaborator failed.
    #[error(transparent)]
    Source(#[from] LedgerError),
}

impl ReportError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::TemplateNotFound(_) => "TEMPLATE_NOT_FOUND",
            Self::TemplateDisabled(_) => "TEMPLATE_DISABLED",
            Self::NoPeriods => "NO_PERIODS",
            Self::DuplicatePeriodKey(_) => "DUPLICATE_PERIOD_KEY",
            Self::InvalidTemplate(_) => "INVALID_TEMPLATE",
            Self::Validation(err) => err.error_code(),
            Self::Configuration(ConfigurationError::UnknownReference { .. }) => "UNKNOWN_REFERENCE",
            Self::Configuration(ConfigurationError::InvalidFormula { .. }) => "INVALID_FORMULA",
            Self::Evaluation { .. } => "FORMULA_EVALUATION_FAILED",
            Self::Source(err) => err.error_code(),
        }
    }

    /// Returns true for template problems that reject a save.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidTemplate(_) | Self::Validation(_))
    }
}

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::TemplateNotFound(_) => Self::NotFound(err.to_string()),
            ReportError::InvalidTemplate(_) | ReportError::Validation(_) => {
                Self::Validation(err.to_string())
            }
            ReportError::TemplateDisabled(_)
            | ReportError::NoPeriods
            | ReportError::DuplicatePeriodKey(_)
            | ReportError::Configuration(_)
            | ReportError::Evaluation { .. } => Self::Configuration(err.to_string()),
            ReportError::Source(source) => source.into(),
        }
    }
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
