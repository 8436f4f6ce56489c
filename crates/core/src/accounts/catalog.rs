//! Chart of accounts records and lookup.

use finstat_shared::types::{AccountId, CompanyId};
use serde::{Deserialize, Serialize};

use crate::filter::{AccountField, FieldLookup, FieldValue, Predicate};
use crate::ledger::LedgerError;

/// An account of the chart of accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique account name (e.g. "Sales - TC").
    pub name: AccountId,
    /// Owning company.
    pub company: CompanyId,
    /// Account name without the company suffix.
    pub account_name: String,
    /// Account number.
    #[serde(default)]
    pub account_number: Option<String>,
    /// Account type (Bank, Receivable, Tax, ...).
    #[serde(default)]
    pub account_type: Option<String>,
    /// Root type (Asset, Liability, Equity, Income, Expense).
    #[serde(default)]
    pub root_type: Option<String>,
    /// Report type (Balance Sheet, Profit and Loss).
    #[serde(default)]
    pub report_type: Option<String>,
    /// Parent group account.
    #[serde(default)]
    pub parent_account: Option<String>,
    /// Account currency.
    #[serde(default)]
    pub account_currency: Option<String>,
    /// Group accounts only aggregate children.
    #[serde(default)]
    pub is_group: bool,
    /// Disabled accounts are never resolved.
    #[serde(default)]
    pub disabled: bool,
}

impl Account {
    /// Creates a ledger account; `account_name` is `name` without the
    /// trailing `" - <abbr>"` suffix.
    #[must_use]
    pub fn new(name: impl Into<AccountId>, company: impl Into<CompanyId>) -> Self {
        let name = name.into();
        let account_name = name
            .as_str()
            .rsplit_once(" - ")
            .map_or(name.as_str(), |(base, _)| base)
            .to_string();
        Self {
            name,
            company: company.into(),
            account_name,
            account_number: None,
            account_type: None,
            root_type: None,
            report_type: None,
            parent_account: None,
            account_currency: None,
            is_group: false,
            disabled: false,
        }
    }

    /// Sets the root type and the report type it implies.
    #[must_use]
    pub fn with_root_type(mut self, root_type: impl Into<String>) -> Self {
        let root_type = root_type.into();
        self.report_type = Some(
            match root_type.as_str() {
                "Income" | "Expense" => "Profit and Loss",
                _ => "Balance Sheet",
            }
            .to_string(),
        );
        self.root_type = Some(root_type);
        self
    }

    /// Sets the account type.
    #[must_use]
    pub fn with_account_type(mut self, account_type: impl Into<String>) -> Self {
        self.account_type = Some(account_type.into());
        self
    }

    /// Sets the account number.
    #[must_use]
    pub fn with_account_number(mut self, account_number: impl Into<String>) -> Self {
        self.account_number = Some(account_number.into());
        self
    }

    /// Sets the parent account.
    #[must_use]
    pub fn with_parent(mut self, parent_account: impl Into<String>) -> Self {
        self.parent_account = Some(parent_account.into());
        self
    }

    /// Marks the account as a group.
    #[must_use]
    pub const fn group(mut self) -> Self {
        self.is_group = true;
        self
    }

    /// Marks the account as disabled.
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

impl FieldLookup for Account {
    fn field_value(&self, field: AccountField) -> FieldValue<'_> {
        match field {
            AccountField::Name => FieldValue::Text(Some(self.name.as_str())),
            AccountField::AccountName => FieldValue::Text(Some(&self.account_name)),
            AccountField::AccountNumber => FieldValue::Text(self.account_number.as_deref()),
            AccountField::AccountType => FieldValue::Text(self.account_type.as_deref()),
            AccountField::RootType => FieldValue::Text(self.root_type.as_deref()),
            AccountField::ReportType => FieldValue::Text(self.report_type.as_deref()),
            AccountField::ParentAccount => FieldValue::Text(self.parent_account.as_deref()),
            AccountField::AccountCurrency => FieldValue::Text(self.account_currency.as_deref()),
            AccountField::IsGroup => FieldValue::Flag(self.is_group),
        }
    }
}

/// Read access to the chart of accounts.
pub trait AccountCatalog {
    /// Returns the enabled accounts of `company` that satisfy `predicate`.
    fn find_accounts(
        &self,
        company: &CompanyId,
        predicate: &Predicate,
    ) -> Result<Vec<AccountId>, LedgerError>;
}

/// Chart of accounts held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAccountCatalog {
    accounts: Vec<Account>,
}

impl InMemoryAccountCatalog {
    /// Creates a catalog from a list of accounts.
    #[must_use]
    pub fn new(accounts: Vec<Account>) -> Self {
        Self { accounts }
    }

    /// Adds an account.
    pub fn insert(&mut self, account: Account) {
        self.accounts.push(account);
    }
}

impl AccountCatalog for InMemoryAccountCatalog {
    fn find_accounts(
        &self,
        company: &CompanyId,
        predicate: &Predicate,
    ) -> Result<Vec<AccountId>, LedgerError> {
        Ok(self
            .accounts
            .iter()
            .filter(|a| &a.company == company && !a.disabled && predicate.matches(*a))
            .map(|a| a.name.clone())
            .collect())
    }
}
