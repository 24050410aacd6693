//! Violations reported by structural rules.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// How serious a violation is. Every violation blocks emission; severity
/// only ranks them for the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A detected deviation from one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    pub location: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} at {}: {}",
            self.rule_id, self.severity, self.location, self.message
        )
    }
}

/// A document failed validation. Carries every violation found.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} structural violation(s); first: {}", .violations.len(), first_or_none(.violations))]
pub struct ValidationFailure {
    pub violations: Vec<Violation>,
}

fn first_or_none(violations: &[Violation]) -> String {
    violations
        .first()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "none".to_string())
}

impl ValidationFailure {
    /// Distinct rule ids, in report order.
    pub fn rule_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for violation in &self.violations {
            if !ids.contains(&violation.rule_id.as_str()) {
                ids.push(&violation.rule_id);
            }
        }
        ids
    }
}
