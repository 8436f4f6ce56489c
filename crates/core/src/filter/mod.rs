//! Filter expressions that select accounts for a report row.
//!
//! A row's filter is a literal such as `["root_type", "=", "Income"]` or
//! `{"or": [[...], [...]]}`. It is parsed into [`FilterCriteria`] and then
//! translated into a [`Predicate`] over the static [`AccountField`] schema.

pub mod criteria;
pub mod error;
pub mod literal;
pub mod predicate;
pub mod schema;

pub use criteria::{
    FilterCriteria, FilterExpressionParser, LogicalCondition, LogicalOperator, SimpleCondition,
};
pub use error::FilterError;
pub use predicate::{ComparisonOperator, Predicate};
pub use schema::{AccountField, FieldKind, FieldLookup, FieldValue};
