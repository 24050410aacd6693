//! The rule abstraction.
//!
//! A rule is an independent checker with a stable id. Rules never depend on
//! each other's output and never stop at the first finding.

use crate::document::DocumentModel;
use crate::violation::{Severity, Violation};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleFamily {
    Naming,
    Nesting,
    Http,
    CrossCutting,
}

impl RuleFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleFamily::Naming => "naming",
            RuleFamily::Nesting => "nesting",
            RuleFamily::Http => "http",
            RuleFamily::CrossCutting => "cross-cutting",
        }
    }
}

impl fmt::Display for RuleFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A structural rule.
pub trait Rule: Send + Sync {
    fn id(&self) -> &str;
    fn family(&self) -> RuleFamily;
    fn severity(&self) -> Severity {
        Severity::Error
    }
    fn description(&self) -> &str;
    fn check(&self, document: &DocumentModel) -> Vec<Violation>;
}

/// Collects findings for one rule, stamping its id and severity.
pub struct Findings<'r> {
    rule: &'r dyn Rule,
    violations: Vec<Violation>,
}

impl<'r> Findings<'r> {
    pub fn new(rule: &'r dyn Rule) -> Self {
        Self {
            rule,
            violations: Vec::new(),
        }
    }

    pub fn push(&mut self, location: impl Into<String>, message: impl Into<String>) {
        self.violations.push(Violation {
            rule_id: self.rule.id().to_string(),
            severity: self.rule.severity(),
            message: message.into(),
            location: location.into(),
        });
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }
}

pub type CheckFn = fn(&DocumentModel, &mut Findings<'_>);

/// A built-in rule: static metadata plus a check function.
#[derive(Clone)]
pub struct BuiltinRule {
    pub id: &'static str,
    pub family: RuleFamily,
    pub severity: Severity,
    pub description: &'static str,
    pub check_fn: CheckFn,
}

impl fmt::Debug for BuiltinRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltinRule")
            .field("id", &self.id)
            .field("family", &self.family)
            .field("severity", &self.severity)
            .finish()
    }
}

impl Rule for BuiltinRule {
    fn id(&self) -> &str {
        self.id
    }

    fn family(&self) -> RuleFamily {
        self.family
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn description(&self) -> &str {
        self.description
    }

    fn check(&self, document: &DocumentModel) -> Vec<Violation> {
        let mut findings = Findings::new(self);
        (self.check_fn)(document, &mut findings);
        findings.into_violations()
    }
}
