//! Translation of filter criteria into account predicates.

use serde_json::Value;
use tracing::debug;

use super::criteria::{FilterCriteria, FilterExpressionParser, LogicalOperator, SimpleCondition};
use super::error::FilterError;
use super::schema::{AccountField, FieldLookup};

/// Comparison operators accepted in a simple condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    /// `=` or `==`.
    Equals,
    /// `!=` or `<>`.
    NotEquals,
    /// `in` (value must be a list).
    In,
    /// `not in` (value must be a list).
    NotIn,
    /// `like` (substring, case-insensitive, `%`/`_` wildcards).
    Like,
    /// `not like`.
    NotLike,
    /// `is` (`"set"`, `"not set"`, or equality).
    Is,
}

impl ComparisonOperator {
    /// Parses an operator as written in a condition.
    #[must_use]
    pub fn parse(operator: &str) -> Option<Self> {
        match operator.trim().to_lowercase().as_str() {
            "=" | "==" => Some(Self::Equals),
            "!=" | "<>" => Some(Self::NotEquals),
            "in" => Some(Self::In),
            "not in" => Some(Self::NotIn),
            "like" => Some(Self::Like),
            "not like" => Some(Self::NotLike),
            "is" => Some(Self::Is),
            _ => None,
        }
    }
}

/// Executable condition over account records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Field equals value.
    Equals(AccountField, String),
    /// Field differs from value.
    NotEquals(AccountField, String),
    /// Field is one of the values.
    In(AccountField, Vec<String>),
    /// Field is none of the values.
    NotIn(AccountField, Vec<String>),
    /// Field matches the `LIKE` pattern.
    Like(AccountField, String),
    /// Field does not match the `LIKE` pattern.
    NotLike(AccountField, String),
    /// Field holds a non-empty value.
    IsSet(AccountField),
    /// Field is empty.
    IsNotSet(AccountField),
    /// All children hold.
    And(Vec<Predicate>),
    /// At least one child holds.
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Evaluates the predicate against a record.
    pub fn matches<R: FieldLookup + ?Sized>(&self, record: &R) -> bool {
        match self {
            Self::Equals(field, value) => record.field_value(*field).as_text() == value.as_str(),
            Self::NotEquals(field, value) => {
                record.field_value(*field).as_text() != value.as_str()
            }
            Self::In(field, values) => {
                let actual = record.field_value(*field);
                values.iter().any(|v| actual.as_text() == v.as_str())
            }
            Self::NotIn(field, values) => {
                let actual = record.field_value(*field);
                values.iter().all(|v| actual.as_text() != v.as_str())
            }
            Self::Like(field, pattern) => like(&record.field_value(*field).as_text(), pattern),
            Self::NotLike(field, pattern) => {
                !like(&record.field_value(*field).as_text(), pattern)
            }
            Self::IsSet(field) => record.field_value(*field).is_set(),
            Self::IsNotSet(field) => !record.field_value(*field).is_set(),
            Self::And(children) => children.iter().all(|p| p.matches(record)),
            Self::Or(children) => children.iter().any(|p| p.matches(record)),
        }
    }
}

impl FilterExpressionParser {
    /// Builds an account predicate from parsed criteria.
    ///
    /// Unknown fields, unsupported operators and invalid nodes produce no
    /// predicate; inside a group they are dropped so the remaining children
    /// still apply. A group with no resolvable child yields `None`.
    #[must_use]
    pub fn build_condition(criteria: &FilterCriteria) -> Option<Predicate> {
        match criteria {
            FilterCriteria::Invalid => None,
            FilterCriteria::Simple(condition) => Self::field_condition(condition),
            FilterCriteria::Logical(group) => {
                let mut children: Vec<Predicate> = group
                    .conditions
                    .iter()
                    .filter_map(Self::build_condition)
                    .collect();

                match children.len() {
                    0 => None,
                    1 => children.pop(),
                    _ => Some(match group.operator {
                        LogicalOperator::And => Predicate::And(children),
                        LogicalOperator::Or => Predicate::Or(children),
                    }),
                }
            }
        }
    }

    /// Checks a filter expression before it is saved on a template.
    ///
    /// Stricter than [`Self::build_condition`]: every node must be valid and
    /// every field and operator must be known.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(expression: &str) -> Result<FilterCriteria, FilterError> {
        let criteria = Self::parse(expression)?;
        if criteria.contains_invalid() {
            return Err(FilterError::InvalidShape(expression.to_string()));
        }

        let mut problem = None;
        criteria.for_each_simple(&mut |condition| {
            if problem.is_some() {
                return;
            }
            if AccountField::from_name(&condition.field).is_none() {
                problem = Some(FilterError::UnknownField(condition.field.clone()));
            } else if ComparisonOperator::parse(&condition.operator).is_none() {
                problem = Some(FilterError::UnsupportedOperator(condition.operator.clone()));
            }
        });

        match problem {
            Some(err) => Err(err),
            None => Ok(criteria),
        }
    }

    fn field_condition(condition: &SimpleCondition) -> Option<Predicate> {
        let Some(field) = AccountField::from_name(&condition.field) else {
            debug!(field = %condition.field, "Dropping filter condition on unknown account field");
            return None;
        };
        let Some(operator) = ComparisonOperator::parse(&condition.operator) else {
            debug!(
                operator = %condition.operator,
                "Dropping filter condition with unsupported operator"
            );
            return None;
        };
        let value = &condition.value;

        match operator {
            ComparisonOperator::Equals => {
                field.normalize(value).map(|v| Predicate::Equals(field, v))
            }
            ComparisonOperator::NotEquals => {
                field.normalize(value).map(|v| Predicate::NotEquals(field, v))
            }
            ComparisonOperator::In => list_values(field, value).map(|v| Predicate::In(field, v)),
            ComparisonOperator::NotIn => {
                list_values(field, value).map(|v| Predicate::NotIn(field, v))
            }
            ComparisonOperator::Like => field
                .normalize(value)
                .map(|v| Predicate::Like(field, format!("%{v}%"))),
            ComparisonOperator::NotLike => field
                .normalize(value)
                .map(|v| Predicate::NotLike(field, format!("%{v}%"))),
            ComparisonOperator::Is => match value {
                Value::Null => Some(Predicate::IsNotSet(field)),
                Value::String(s) if s.eq_ignore_ascii_case("set") => Some(Predicate::IsSet(field)),
                Value::String(s) if s.eq_ignore_ascii_case("not set") => {
                    Some(Predicate::IsNotSet(field))
                }
                _ => field.normalize(value).map(|v| Predicate::Equals(field, v)),
            },
        }
    }
}

fn list_values(field: AccountField, value: &Value) -> Option<Vec<String>> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(|item| field.normalize(item)).collect())
}

/// SQL `LIKE` matching, case-insensitive: `%` is any run, `_` one character.
fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.to_lowercase().chars().collect();
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();

    let (mut t, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('%') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some('_') => {
                t += 1;
                p += 1;
            }
            Some(c) if *c == text[t] => {
                t += 1;
                p += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    t = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| *c == '%')
}
