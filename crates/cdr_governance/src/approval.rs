//! Approval suspend points.
//!
//! A session that cannot bind a field on its own stops with a
//! [`PendingDecision`] and waits for a human [`Decision`]. Nothing is
//! substituted silently, and pending decisions expire.

use crate::insertion::InsertionRequest;
use crate::resolver::{FieldRequest, Suggestion};
use cdr_dictionary::CdrRow;
use cdr_ids::ApprovalId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default time a pending decision stays open.
pub const DEFAULT_APPROVAL_TIMEOUT_MINUTES: i64 = 30;

/// A field waiting on a human decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingDecision {
    pub approval_id: ApprovalId,

    /// The request that failed to resolve exactly.
    pub field: FieldRequest,

    /// Position of `field` in the session's request list.
    pub field_index: usize,

    /// Ranked near misses; empty when resolution found nothing.
    pub suggestions: Vec<Suggestion>,

    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PendingDecision {
    pub fn new(
        field: FieldRequest,
        field_index: usize,
        suggestions: Vec<Suggestion>,
        timeout: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            approval_id: ApprovalId::new(),
            field,
            field_index,
            suggestions,
            created_at: now,
            expires_at: expiry_after(now, timeout),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// True when the decision was raised with no candidates at all.
    pub fn is_no_match(&self) -> bool {
        self.suggestions.is_empty()
    }

    /// Whether `row` sits under the pending field's (concept, context).
    pub fn in_scope(&self, row: &CdrRow) -> bool {
        row.in_scope(&self.field.concept, &self.field.context)
    }
}

/// The human answer to a [`PendingDecision`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Use an existing canonical row in place of the requested name.
    SelectExisting(CdrRow),

    /// Add the field to the dictionary, then bind it.
    ApproveInsertion(InsertionRequest),

    /// Give up on the whole request.
    Abort { reason: String },
}

impl Decision {
    pub fn kind(&self) -> &'static str {
        match self {
            Decision::SelectExisting(_) => "select_existing",
            Decision::ApproveInsertion(_) => "approve_insertion",
            Decision::Abort { .. } => "abort",
        }
    }
}

/// `now + timeout`, saturating at the latest representable instant.
fn expiry_after(now: DateTime<Utc>, timeout: Duration) -> DateTime<Utc> {
    now.checked_add_signed(timeout)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(timeout: Duration) -> PendingDecision {
        PendingDecision::new(
            FieldRequest::new("Customer", "Contact", "mobileNumber", true),
            0,
            Vec::new(),
            timeout,
        )
    }

    #[test]
    fn default_timeout_is_thirty_minutes() {
        let decision = pending(Duration::minutes(DEFAULT_APPROVAL_TIMEOUT_MINUTES));
        assert_eq!(decision.expires_at - decision.created_at, Duration::minutes(30));
        assert!(!decision.is_expired());
        assert!(decision.is_expired_at(decision.created_at + Duration::minutes(30)));
        assert!(!decision.is_expired_at(decision.created_at + Duration::minutes(29)));
    }

    #[test]
    fn huge_timeout_saturates_instead_of_overflowing() {
        let decision = pending(Duration::MAX);
        assert_eq!(decision.expires_at, DateTime::<Utc>::MAX_UTC);
        assert!(!decision.is_expired());
    }

    #[test]
    fn no_suggestions_means_no_match() {
        assert!(pending(Duration::minutes(1)).is_no_match());
    }

    #[test]
    fn decision_serializes_snake_case() {
        let abort = Decision::Abort {
            reason: "wrong concept".into(),
        };
        let json = serde_json::to_value(&abort).unwrap();
        assert_eq!(json["abort"]["reason"], "wrong concept");
        assert_eq!(abort.kind(), "abort");
    }
}
