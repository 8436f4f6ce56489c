//! Template storage seam.

use std::collections::HashMap;

use tracing::info;

use super::error::ReportError;
use super::template::ReportTemplate;

/// Read access to saved report templates.
pub trait TemplateSource {
    /// Returns the template named `name`, if any.
    fn load_template(&self, name: &str) -> Option<ReportTemplate>;
}

/// Templates held in memory, validated on save.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTemplateStore {
    templates: HashMap<String, ReportTemplate>,
}

impl InMemoryTemplateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and stores a template, replacing any with the same name.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::InvalidTemplate`] and stores nothing if the
    /// template does not validate.
    pub fn save(&mut self, template: ReportTemplate) -> Result<(), ReportError> {
        template.validate()?;
        info!(
            template = %template.name,
            rows = template.rows.len(),
            "Report template saved"
        );
        self.templates.insert(template.name.clone(), template);
        Ok(())
    }

    /// Removes a template; returns it if it existed.
    pub fn remove(&mut self, name: &str) -> Option<ReportTemplate> {
        self.templates.remove(name)
    }
}

impl TemplateSource for InMemoryTemplateStore {
    fn load_template(&self, name: &str) -> Option<ReportTemplate> {
        self.templates.get(name).cloned()
    }
}
