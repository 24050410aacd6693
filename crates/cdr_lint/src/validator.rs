//! Runs every enabled rule over a document.

use crate::document::DocumentModel;
use crate::registry::RuleRegistry;
use crate::violation::{ValidationFailure, Violation};
use tracing::{debug, warn};

/// Pure structural validator. Never consults the dictionary.
#[derive(Debug, Default)]
pub struct StructuralValidator {
    registry: RuleRegistry,
}

impl StructuralValidator {
    pub fn new(registry: RuleRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Every violation from every enabled rule, in registry order.
    pub fn validate(&self, document: &DocumentModel) -> Vec<Violation> {
        let mut violations = Vec::new();
        for rule in self.registry.enabled_rules() {
            let found = rule.check(document);
            if !found.is_empty() {
                debug!(rule = rule.id(), count = found.len(), "Rule reported violations");
            }
            violations.extend(found);
        }
        violations
    }

    /// `Ok` when the document is clean, otherwise the full violation list.
    pub fn check(&self, document: &DocumentModel) -> Result<(), ValidationFailure> {
        let violations = self.validate(document);
        if violations.is_empty() {
            return Ok(());
        }
        warn!(
            count = violations.len(),
            base_uri = %document.base_uri,
            "Document failed structural validation"
        );
        Err(ValidationFailure { violations })
    }
}
