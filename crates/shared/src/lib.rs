//! Shared types, errors, and configuration for Finstat.
//!
//! This crate provides common types used across all other crates:
//! - Typed identifiers for ledger entities
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, ReportSettings};
pub use error::{AppError, AppResult};
