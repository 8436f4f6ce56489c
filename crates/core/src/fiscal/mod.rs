//! Reporting periods.

pub mod period;

pub use period::{Period, PeriodError, Periodicity, generate_periods};
