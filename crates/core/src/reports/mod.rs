//! Template-driven financial statements.
//!
//! A [`ReportTemplate`] lists rows of account data, formulas and layout.
//! [`FinancialReportEngine`] resolves each account data row's filter,
//! fetches balances for all rows in one pass, evaluates formulas in
//! dependency order and returns a [`FinancialReport`].

pub mod collector;
pub mod dependency;
pub mod error;
pub mod formula;
pub mod service;
pub mod store;
pub mod template;
pub mod types;


pub use collector::{LedgerSources, PeriodAccountDataCollector};
pub use dependency::DependencyResolver;
pub use error::{ConfigurationError, FormulaError, ReportError, ValidationError};
pub use formula::{BinaryOp, Expr, FormulaCalculator};
pub use service::FinancialReportEngine;
pub use store::{InMemoryTemplateStore, TemplateSource};
pub use template::{ReportRow, ReportTemplate, ReportType, RowType, is_valid_reference_code};
pub use types::{FinancialReport, ReportLine};
