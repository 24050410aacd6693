//! Governance configuration
//!
//! Read from `config.toml` under the CDR home directory. Every key is
//! optional; a missing file yields the defaults.

use crate::approval::DEFAULT_APPROVAL_TIMEOUT_MINUTES;
use crate::resolver::FieldResolver;
use crate::similarity::{DEFAULT_MAX_SUGGESTIONS, SUGGESTION_THRESHOLD};
use cdr_dictionary::CanonicalDictionary;
use cdr_lint::{RegistryError, RuleRegistry, StructuralValidator};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Longest allowed approval timeout: one year.
pub const MAX_APPROVAL_TIMEOUT_MINUTES: i64 = 365 * 24 * 60;

/// Error type for config operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Invalid lint config: {0}")]
    Registry(#[from] RegistryError),
}

/// Result type for config operations
pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GovernanceConfig {
    /// Dictionary CSV; the CLI falls back to `cdr.csv` in the home directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dictionary_path: Option<PathBuf>,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub lint: LintConfig,
}

/// Suggestion ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Minimum similarity score, inclusive
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Suggestions surfaced per unresolved field
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            max_suggestions: default_max_suggestions(),
        }
    }
}

/// Session lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Minutes a pending decision stays open before the session is cancelled
    #[serde(default = "default_approval_timeout_minutes")]
    pub approval_timeout_minutes: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            approval_timeout_minutes: default_approval_timeout_minutes(),
        }
    }
}

/// Structural rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LintConfig {
    /// Rule ids that do not run
    #[serde(default)]
    pub disabled_rules: Vec<String>,
}

// Default value functions
fn default_threshold() -> f64 {
    SUGGESTION_THRESHOLD
}

fn default_max_suggestions() -> usize {
    DEFAULT_MAX_SUGGESTIONS
}

fn default_approval_timeout_minutes() -> i64 {
    DEFAULT_APPROVAL_TIMEOUT_MINUTES
}

impl GovernanceConfig {
    /// Load from `path`; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        let threshold = self.resolver.threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Invalid(format!(
                "resolver.threshold must be within 0.0..=1.0, got {}",
                threshold
            )));
        }
        if self.resolver.max_suggestions == 0 {
            return Err(ConfigError::Invalid(
                "resolver.max_suggestions must be at least 1".to_string(),
            ));
        }
        let minutes = self.session.approval_timeout_minutes;
        if minutes <= 0 || minutes > MAX_APPROVAL_TIMEOUT_MINUTES {
            return Err(ConfigError::Invalid(format!(
                "session.approval_timeout_minutes must be within 1..={}, got {}",
                MAX_APPROVAL_TIMEOUT_MINUTES, minutes
            )));
        }
        Ok(())
    }

    /// Pending-decision lifetime. Fails for values `validate` would reject,
    /// since the fields are public and may change after loading.
    pub fn approval_timeout(&self) -> Result<chrono::Duration> {
        let minutes = self.session.approval_timeout_minutes;
        if minutes <= 0 || minutes > MAX_APPROVAL_TIMEOUT_MINUTES {
            return Err(ConfigError::Invalid(format!(
                "session.approval_timeout_minutes out of range: {}",
                minutes
            )));
        }
        chrono::Duration::try_minutes(minutes).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "session.approval_timeout_minutes out of range: {}",
                minutes
            ))
        })
    }

    /// Validator over the default catalog minus disabled rules.
    pub fn build_validator(&self) -> Result<StructuralValidator> {
        let mut registry = RuleRegistry::with_default_rules();
        registry.disable_all(&self.lint.disabled_rules)?;
        Ok(StructuralValidator::new(registry))
    }

    pub fn build_resolver(&self, dictionary: Arc<CanonicalDictionary>) -> FieldResolver {
        FieldResolver::new(dictionary)
            .with_threshold(self.resolver.threshold)
            .with_max_suggestions(self.resolver.max_suggestions)
    }
}
