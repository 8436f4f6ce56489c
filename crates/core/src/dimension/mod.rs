//! Dimensional tagging and filtering of ledger rows.

pub mod filter;

pub use filter::{DimensionFilter, DimensionTags};
