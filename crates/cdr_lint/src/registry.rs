//! Rule registry: named, independently removable checker units.

use crate::rule::Rule;
use crate::rules::builtin_rules;
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Rule '{0}' is already registered")]
    DuplicateRule(String),

    #[error("Unknown rule '{0}'")]
    UnknownRule(String),
}

pub struct RuleRegistry {
    rules: Vec<Box<dyn Rule>>,
    disabled: BTreeSet<String>,
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rule_count", &self.rules.len())
            .field("disabled", &self.disabled)
            .finish()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

impl RuleRegistry {
    /// Registry with no rules.
    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            disabled: BTreeSet::new(),
        }
    }

    /// Registry with the full built-in catalog.
    pub fn with_default_rules() -> Self {
        let mut registry = Self::empty();
        for rule in builtin_rules() {
            registry.rules.push(Box::new(rule));
        }
        registry
    }

    /// Add a rule. Ids must be unique.
    pub fn register(&mut self, rule: Box<dyn Rule>) -> Result<(), RegistryError> {
        if self.get(rule.id()).is_some() {
            return Err(RegistryError::DuplicateRule(rule.id().to_string()));
        }
        self.rules.push(rule);
        Ok(())
    }

    pub fn with_rule(mut self, rule: Box<dyn Rule>) -> Result<Self, RegistryError> {
        self.register(rule)?;
        Ok(self)
    }

    pub fn disable(&mut self, id: &str) -> Result<(), RegistryError> {
        if self.get(id).is_none() {
            return Err(RegistryError::UnknownRule(id.to_string()));
        }
        self.disabled.insert(id.to_string());
        Ok(())
    }

    /// Disable every id in `ids`, failing on the first unknown one.
    pub fn disable_all<I, S>(&mut self, ids: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for id in ids {
            self.disable(id.as_ref())?;
        }
        Ok(())
    }

    pub fn enable(&mut self, id: &str) {
        self.disabled.remove(id);
    }

    pub fn is_enabled(&self, id: &str) -> bool {
        self.get(id).is_some() && !self.disabled.contains(id)
    }

    pub fn get(&self, id: &str) -> Option<&dyn Rule> {
        self.rules.iter().find(|r| r.id() == id).map(|r| r.as_ref())
    }

    /// All rules, in registration order.
    pub fn rules(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    pub fn enabled_rules(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules()
            .filter(move |r| !self.disabled.contains(r.id()))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
