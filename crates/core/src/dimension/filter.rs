//! Dimensional filtering for reports.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Dimension values a ledger row is tagged with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionTags {
    /// Cost center.
    #[serde(default)]
    pub cost_center: Option<String>,
    /// Project.
    #[serde(default)]
    pub project: Option<String>,
    /// Custom accounting dimensions keyed by field name.
    #[serde(default)]
    pub accounting_dimensions: BTreeMap<String, String>,
}

impl DimensionTags {
    /// Creates an untagged set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cost center.
    #[must_use]
    pub fn with_cost_center(mut self, cost_center: impl Into<String>) -> Self {
        self.cost_center = Some(cost_center.into());
        self
    }

    /// Sets the project.
    #[must_use]
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Sets a custom accounting dimension.
    #[must_use]
    pub fn with_dimension(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.accounting_dimensions.insert(field.into(), value.into());
        self
    }
}

/// Filter for dimensional queries.
///
/// Every non-empty list restricts rows to those tagged with one of its
/// values; empty lists match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionFilter {
    /// Allowed cost centers.
    #[serde(default)]
    pub cost_centers: Vec<String>,
    /// Allowed projects.
    #[serde(default)]
    pub projects: Vec<String>,
    /// Allowed values per custom accounting dimension.
    #[serde(default)]
    pub accounting_dimensions: BTreeMap<String, Vec<String>>,
}

impl DimensionFilter {
    /// Creates a new empty filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a cost center to the filter.
    #[must_use]
    pub fn with_cost_center(mut self, cost_center: impl Into<String>) -> Self {
        self.cost_centers.push(cost_center.into());
        self
    }

    /// Adds a project to the filter.
    #[must_use]
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.projects.push(project.into());
        self
    }

    /// Adds an allowed value for a custom accounting dimension.
    #[must_use]
    pub fn with_dimension(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.accounting_dimensions
            .entry(field.into())
            .or_default()
            .push(value.into());
        self
    }

    /// Returns true if the filter is empty (matches everything).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cost_centers.is_empty()
            && self.projects.is_empty()
            && self.accounting_dimensions.values().all(Vec::is_empty)
    }

    /// Returns true if a row with the given tags passes the filter.
    #[must_use]
    pub fn matches(&self, tags: &DimensionTags) -> bool {
        allows(&self.cost_centers, tags.cost_center.as_deref())
            && allows(&self.projects, tags.project.as_deref())
            && self.accounting_dimensions.iter().all(|(field, values)| {
                allows(
                    values,
                    tags.accounting_dimensions.get(field).map(String::as_str),
                )
            })
    }
}

fn allows(allowed: &[String], value: Option<&str>) -> bool {
    allowed.is_empty() || value.is_some_and(|v| allowed.iter().any(|a| a == v))
}
