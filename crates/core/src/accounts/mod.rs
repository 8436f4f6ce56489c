//! Chart of accounts and filter-based account resolution.

pub mod catalog;
pub mod resolver;

pub use catalog::{Account, AccountCatalog, InMemoryAccountCatalog};
pub use resolver::AccountResolver;
