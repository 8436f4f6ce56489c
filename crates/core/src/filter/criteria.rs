//! Structured filter criteria parsed from a filter expression.

use serde::Serialize;
use serde_json::Value;

use super::error::FilterError;
use super::literal::parse_literal;

/// Logical connective of a condition group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOperator {
    /// All children must hold.
    And,
    /// At least one child must hold.
    Or,
}

impl LogicalOperator {
    fn from_key(key: &str) -> Option<Self> {
        match key.to_lowercase().as_str() {
            "and" => Some(Self::And),
            "or" => Some(Self::Or),
            _ => None,
        }
    }
}

/// A `[field, operator, value]` leaf.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimpleCondition {
    /// Field name as written.
    pub field: String,
    /// Operator as written.
    pub operator: String,
    /// Comparison value.
    pub value: Value,
}

/// An `{"and"|"or": [...]}` group with at least two children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogicalCondition {
    /// Connective.
    pub operator: LogicalOperator,
    /// Child criteria (any of which may itself be invalid).
    pub conditions: Vec<FilterCriteria>,
}

/// Parse result of a filter expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FilterCriteria {
    /// Single comparison.
    Simple(SimpleCondition),
    /// Logical group.
    Logical(LogicalCondition),
    /// Well-formed literal of an unsupported shape.
    Invalid,
}

impl FilterCriteria {
    /// Returns true if this node or any descendant is invalid.
    #[must_use]
    pub fn contains_invalid(&self) -> bool {
        match self {
            Self::Invalid => true,
            Self::Simple(_) => false,
            Self::Logical(group) => group.conditions.iter().any(Self::contains_invalid),
        }
    }

    /// Visits every simple condition in depth-first order.
    pub fn for_each_simple<'a>(&'a self, visit: &mut impl FnMut(&'a SimpleCondition)) {
        match self {
            Self::Simple(condition) => visit(condition),
            Self::Logical(group) => {
                for child in &group.conditions {
                    child.for_each_simple(visit);
                }
            }
            Self::Invalid => {}
        }
    }
}

/// Converts filter expressions into criteria and account predicates.
pub struct FilterExpressionParser;

impl FilterExpressionParser {
    /// Parses a filter expression.
    ///
    /// Accepts `[field, operator, value]` or a single-key map whose key is
    /// `and`/`or` (any case) and whose value lists at least two nested
    /// conditions. Any other well-formed literal yields
    /// [`FilterCriteria::Invalid`].
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::Syntax`] if the text is not a literal at all.
    pub fn parse(expression: &str) -> Result<FilterCriteria, FilterError> {
        let literal = parse_literal(expression)?;
        Ok(Self::criteria_from_value(&literal))
    }

    fn criteria_from_value(value: &Value) -> FilterCriteria {
        match value {
            Value::Object(_) => Self::parse_logical(value),
            _ => Self::parse_simple(value).unwrap_or(FilterCriteria::Invalid),
        }
    }

    fn parse_logical(value: &Value) -> FilterCriteria {
        let Value::Object(map) = value else {
            return FilterCriteria::Invalid;
        };
        if map.len() != 1 {
            return FilterCriteria::Invalid;
        }
        let Some((key, children)) = map.iter().next() else {
            return FilterCriteria::Invalid;
        };
        let Some(operator) = LogicalOperator::from_key(key) else {
            return FilterCriteria::Invalid;
        };
        let Value::Array(children) = children else {
            return FilterCriteria::Invalid;
        };
        if children.len() < 2 {
            return FilterCriteria::Invalid;
        }

        let conditions = children.iter().map(Self::criteria_from_value).collect();
        FilterCriteria::Logical(LogicalCondition {
            operator,
            conditions,
        })
    }

    fn parse_simple(value: &Value) -> Option<FilterCriteria> {
        match value.as_array()?.as_slice() {
            [Value::String(field), Value::String(operator), value] => {
                Some(FilterCriteria::Simple(SimpleCondition {
                    field: field.clone(),
                    operator: operator.clone(),
                    value: value.clone(),
                }))
            }
            _ => None,
        }
    }
}
