//! Static schema of the account catalog fields a filter may reference.

use std::borrow::Cow;
use std::fmt;

use serde_json::Value;

/// How a field's values are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text; equality is exact, `like` is case-insensitive.
    Text,
    /// Boolean check box stored as `1`/`0`.
    Flag,
}

/// Account attributes that filter expressions may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountField {
    /// Unique account name (e.g. "Sales - TC").
    Name,
    /// Account name without the company suffix.
    AccountName,
    /// Account number.
    AccountNumber,
    /// Account type (Bank, Receivable, Tax, ...).
    AccountType,
    /// Root type (Asset, Liability, Equity, Income, Expense).
    RootType,
    /// Report type (Balance Sheet, Profit and Loss).
    ReportType,
    /// Parent group account.
    ParentAccount,
    /// Account currency.
    AccountCurrency,
    /// Whether the account is a group.
    IsGroup,
}

impl AccountField {
    /// All fields, in schema order.
    pub const ALL: [Self; 9] = [
        Self::Name,
        Self::AccountName,
        Self::AccountNumber,
        Self::AccountType,
        Self::RootType,
        Self::ReportType,
        Self::ParentAccount,
        Self::AccountCurrency,
        Self::IsGroup,
    ];

    /// Looks a field up by its column name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }

    /// Column name of the field.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::AccountName => "account_name",
            Self::AccountNumber => "account_number",
            Self::AccountType => "account_type",
            Self::RootType => "root_type",
            Self::ReportType => "report_type",
            Self::ParentAccount => "parent_account",
            Self::AccountCurrency => "account_currency",
            Self::IsGroup => "is_group",
        }
    }

    /// Comparison kind of the field.
    #[must_use]
    pub const fn kind(self) -> FieldKind {
        match self {
            Self::IsGroup => FieldKind::Flag,
            _ => FieldKind::Text,
        }
    }

    /// Normalizes a filter value into the field's textual form.
    ///
    /// Returns `None` for values that can never match (null, nested lists,
    /// maps, or a flag value that is not a boolean spelling).
    #[must_use]
    pub fn normalize(self, value: &Value) -> Option<String> {
        match self.kind() {
            FieldKind::Flag => parse_flag(value).map(|flag| flag_text(flag).to_string()),
            FieldKind::Text => match value {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(flag_text(*b).to_string()),
                Value::Null | Value::Array(_) | Value::Object(_) => None,
            },
        }
    }
}

impl fmt::Display for AccountField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The value a record holds for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    /// Text value; `None` when unset.
    Text(Option<&'a str>),
    /// Flag value.
    Flag(bool),
}

impl FieldValue<'_> {
    /// Returns true if the value counts as set (non-empty text; flags always).
    #[must_use]
    pub fn is_set(&self) -> bool {
        match self {
            Self::Text(text) => text.is_some_and(|t| !t.is_empty()),
            Self::Flag(_) => true,
        }
    }

    /// Textual form used for comparisons; unset text compares as empty.
    #[must_use]
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(text) => Cow::Borrowed(text.unwrap_or_default()),
            Self::Flag(flag) => Cow::Borrowed(flag_text(*flag)),
        }
    }
}

/// A record whose fields can be tested by a filter predicate.
pub trait FieldLookup {
    /// Returns the record's value for `field`.
    fn field_value(&self, field: AccountField) -> FieldValue<'_>;
}

fn parse_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Some(true),
            "0" | "false" | "no" => Some(false),
            _ => None,
        },
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

const fn flag_text(flag: bool) -> &'static str {
    if flag { "1" } else { "0" }
}
