//! Core logic for template-driven financial statements.
//!
//! This crate has no web or database dependencies. Storage is reached
//! through the traits in [`accounts`], [`ledger`] and [`reports::store`],
//! each with an in-memory implementation.
//!
//! # Modules
//!
//! - `filter` - Account filter expressions
//! - `accounts` - Chart of accounts and filter resolution
//! - `dimension` - Cost center, project and accounting dimension filters
//! - `fiscal` - Reporting periods
//! - `ledger` - Ledger postings, closing snapshots and period balances
//! - `reports` - Templates, formulas and report generation

pub mod accounts;
pub mod dimension;
pub mod filter;
pub mod fiscal;
pub mod ledger;
pub mod reports;
