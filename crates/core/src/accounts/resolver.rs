//! Resolution of a row's filter expression into concrete accounts.

use finstat_shared::types::{AccountId, CompanyId};
use tracing::{debug, warn};

use super::catalog::AccountCatalog;
use crate::filter::{FilterCriteria, FilterExpressionParser};
use crate::ledger::LedgerError;

/// Resolves filter expressions against one company's chart of accounts.
pub struct AccountResolver<'a> {
    catalog: &'a dyn AccountCatalog,
    company: &'a CompanyId,
}

impl<'a> AccountResolver<'a> {
    /// Creates a resolver scoped to `company`.
    #[must_use]
    pub fn new(catalog: &'a dyn AccountCatalog, company: &'a CompanyId) -> Self {
        Self { catalog, company }
    }

    /// Returns the enabled accounts matching `filter_expression`, in
    /// ascending order without duplicates.
    ///
    /// Malformed or unresolvable expressions match no accounts.
    ///
    /// # Errors
    ///
    /// Propagates catalog failures.
    pub fn resolve(&self, filter_expression: &str) -> Result<Vec<AccountId>, LedgerError> {
        let criteria = match FilterExpressionParser::parse(filter_expression) {
            Ok(criteria) => criteria,
            Err(err) => {
                warn!(
                    company = %self.company,
                    filter = filter_expression,
                    error = %err,
                    "Unparseable account filter, no accounts matched"
                );
                return Ok(Vec::new());
            }
        };

        if criteria == FilterCriteria::Invalid {
            warn!(
                company = %self.company,
                filter = filter_expression,
                "Invalid account filter shape, no accounts matched"
            );
            return Ok(Vec::new());
        }

        let Some(predicate) = FilterExpressionParser::build_condition(&criteria) else {
            debug!(
                company = %self.company,
                filter = filter_expression,
                "Account filter has no usable condition"
            );
            return Ok(Vec::new());
        };

        let mut accounts = self.catalog.find_accounts(self.company, &predicate)?;
        accounts.sort();
        accounts.dedup();

        debug!(
            company = %self.company,
            filter = filter_expression,
            matched = accounts.len(),
            "Resolved account filter"
        );
        Ok(accounts)
    }
}
