//! Field resolution against the canonical dictionary.

use crate::similarity::{similarity, DEFAULT_MAX_SUGGESTIONS, SUGGESTION_THRESHOLD};
use cdr_dictionary::{CanonicalDictionary, CdrRow};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

/// A proposed field under a (concept, context) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRequest {
    pub concept: String,
    pub context: String,
    pub field_name: String,
    #[serde(default)]
    pub required: bool,
}

impl FieldRequest {
    pub fn new(
        concept: impl Into<String>,
        context: impl Into<String>,
        field_name: impl Into<String>,
        required: bool,
    ) -> Self {
        Self {
            concept: concept.into(),
            context: context.into(),
            field_name: field_name.into(),
            required,
        }
    }

    pub fn label(&self) -> String {
        format!("{}:{}:{}", self.concept, self.context, self.field_name)
    }
}

/// A near-miss candidate with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub row: CdrRow,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    Exact { row: CdrRow },
    Suggestions { suggestions: Vec<Suggestion> },
    NoMatch,
}

impl Resolution {
    pub fn is_exact(&self) -> bool {
        matches!(self, Resolution::Exact { .. })
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        match self {
            Resolution::Suggestions { suggestions } => suggestions,
            _ => &[],
        }
    }
}

/// True when `score` clears `threshold`. The boundary is inclusive.
pub fn passes_threshold(score: f64, threshold: f64) -> bool {
    score >= threshold
}

/// Resolves proposed fields to canonical rows. Pure with respect to the
/// dictionary: resolving never writes.
#[derive(Debug, Clone)]
pub struct FieldResolver {
    dictionary: Arc<CanonicalDictionary>,
    threshold: f64,
    max_suggestions: usize,
}

impl FieldResolver {
    pub fn new(dictionary: Arc<CanonicalDictionary>) -> Self {
        Self {
            dictionary,
            threshold: SUGGESTION_THRESHOLD,
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_max_suggestions(mut self, max_suggestions: usize) -> Self {
        self.max_suggestions = max_suggestions;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn max_suggestions(&self) -> usize {
        self.max_suggestions
    }

    pub fn dictionary(&self) -> &Arc<CanonicalDictionary> {
        &self.dictionary
    }

    pub fn resolve_request(&self, request: &FieldRequest) -> Resolution {
        self.resolve(&request.concept, &request.context, &request.field_name)
    }

    pub fn resolve(&self, concept: &str, context: &str, field_name: &str) -> Resolution {
        let candidates = self.dictionary.filter(concept, context);

        if let Some(row) = candidates
            .iter()
            .find(|row| row.data_requirement() == field_name)
        {
            debug!(concept, context, field_name, uid = %row.uid(), "Exact canonical match");
            return Resolution::Exact { row: row.clone() };
        }

        let suggestions = self.rank(field_name, candidates);
        debug!(
            concept,
            context,
            field_name,
            suggestions = suggestions.len(),
            "No exact match"
        );
        if suggestions.is_empty() {
            Resolution::NoMatch
        } else {
            Resolution::Suggestions { suggestions }
        }
    }

    /// Score, filter and order candidates. The sort is stable, so equal
    /// scores keep dictionary order.
    fn rank(&self, field_name: &str, candidates: Vec<CdrRow>) -> Vec<Suggestion> {
        let mut scored: Vec<Suggestion> = candidates
            .into_iter()
            .map(|row| {
                let score = similarity(field_name, row.data_requirement());
                Suggestion { row, score }
            })
            .filter(|s| passes_threshold(s.score, self.threshold))
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(self.max_suggestions);
        scored
    }
}
