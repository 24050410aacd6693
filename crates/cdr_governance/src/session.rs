//! Governance sessions.
//!
//! One session carries one request from field collection to an emitted (or
//! rejected) document:
//!
//! ```text
//! Collecting -> Resolving <-> AwaitingApproval
//!                   |
//!                   v
//!              Validating -> Ready | Rejected
//! ```
//!
//! `Failed` and `Cancelled` are reachable from every non-terminal state.
//! Terminal sessions accept no further operations.

use crate::approval::{Decision, PendingDecision, DEFAULT_APPROVAL_TIMEOUT_MINUTES};
use crate::assembly::{assemble, DocumentSkeleton};
use crate::insertion::{InsertionCoordinator, InsertionError, InsertionReceipt};
use crate::resolver::{FieldRequest, FieldResolver, Resolution, Suggestion};
use cdr_dictionary::{CanonicalDictionary, CdrRow};
use cdr_ids::{ApprovalId, SessionId};
use cdr_lint::{DocumentModel, StructuralValidator, Violation};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

// ============================================================================
// Session State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Accepting field requests and the document skeleton
    Collecting,
    /// Binding requests to canonical rows
    Resolving,
    /// Suspended on a human decision
    AwaitingApproval,
    /// Assembling and linting the document
    Validating,
    /// Document emitted
    Ready,
    /// Document blocked by structural violations
    Rejected,
    /// Invariant breach
    Failed,
    /// Aborted, cancelled or expired
    Cancelled,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Collecting => "collecting",
            SessionState::Resolving => "resolving",
            SessionState::AwaitingApproval => "awaiting_approval",
            SessionState::Validating => "validating",
            SessionState::Ready => "ready",
            SessionState::Rejected => "rejected",
            SessionState::Failed => "failed",
            SessionState::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Ready
                | SessionState::Rejected
                | SessionState::Failed
                | SessionState::Cancelled
        )
    }

    pub fn valid_transitions(&self) -> &'static [SessionState] {
        match self {
            SessionState::Collecting => &[
                SessionState::Resolving,
                SessionState::Failed,
                SessionState::Cancelled,
            ],
            SessionState::Resolving => &[
                SessionState::AwaitingApproval,
                SessionState::Validating,
                SessionState::Failed,
                SessionState::Cancelled,
            ],
            SessionState::AwaitingApproval => &[
                SessionState::Resolving,
                SessionState::Failed,
                SessionState::Cancelled,
            ],
            SessionState::Validating => &[
                SessionState::Ready,
                SessionState::Rejected,
                SessionState::Failed,
                SessionState::Cancelled,
            ],
            SessionState::Ready
            | SessionState::Rejected
            | SessionState::Failed
            | SessionState::Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, target: SessionState) -> bool {
        self.valid_transitions().contains(&target)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recorded state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: SessionState,
    pub to: SessionState,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
}

impl StateTransition {
    pub fn new(from: SessionState, to: SessionState) -> Self {
        Self {
            from,
            to,
            timestamp: Utc::now(),
            reason: None,
            actor: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }
}

// ============================================================================
// Errors
// ============================================================================

/// A field reached validation without a canonical binding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Field '{label}' (request {index}) has no canonical binding")]
pub struct UnresolvedFieldError {
    pub index: usize,
    pub label: String,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: SessionState, to: SessionState },

    #[error("Session is terminal: {0}")]
    Terminal(SessionState),

    #[error("Cannot {operation} while {state}")]
    WrongState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("No field requests were added")]
    NoFields,

    #[error("No document skeleton was set")]
    NoSkeleton,

    #[error("No decision is pending")]
    NoPendingDecision,

    #[error("Decision {approval_id} expired at {expired_at}")]
    DecisionExpired {
        approval_id: ApprovalId,
        expired_at: DateTime<Utc>,
    },

    #[error("Invalid decision: {0}")]
    InvalidDecision(String),

    #[error("Invalid field request: {0}")]
    InvalidField(String),

    #[error(transparent)]
    Insertion(#[from] InsertionError),

    #[error(transparent)]
    Unresolved(#[from] UnresolvedFieldError),
}

// ============================================================================
// Steps
// ============================================================================

/// Where the session stopped after `advance` or `decide`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionStep {
    NeedsDecision { pending: PendingDecision },
    Ready { document: DocumentModel },
    Rejected { violations: Vec<Violation> },
    Cancelled { reason: String },
}

impl SessionStep {
    pub fn state(&self) -> SessionState {
        match self {
            SessionStep::NeedsDecision { .. } => SessionState::AwaitingApproval,
            SessionStep::Ready { .. } => SessionState::Ready,
            SessionStep::Rejected { .. } => SessionState::Rejected,
            SessionStep::Cancelled { .. } => SessionState::Cancelled,
        }
    }
}

// ============================================================================
// Governance Session
// ============================================================================

pub struct GovernanceSession {
    id: SessionId,
    resolver: FieldResolver,
    coordinator: InsertionCoordinator,
    validator: Arc<StructuralValidator>,
    approval_timeout: Duration,

    state: SessionState,
    history: Vec<StateTransition>,

    fields: Vec<FieldRequest>,
    bindings: Vec<Option<CdrRow>>,
    skeleton: Option<DocumentSkeleton>,
    pending: Option<PendingDecision>,
    document: Option<DocumentModel>,
    violations: Vec<Violation>,
    insertions: Vec<InsertionReceipt>,
}

impl fmt::Debug for GovernanceSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GovernanceSession")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("fields", &self.fields.len())
            .field("bound", &self.bound_count())
            .finish()
    }
}

impl GovernanceSession {
    pub fn new(dictionary: Arc<CanonicalDictionary>, validator: Arc<StructuralValidator>) -> Self {
        Self {
            id: SessionId::new(),
            resolver: FieldResolver::new(dictionary.clone()),
            coordinator: InsertionCoordinator::new(dictionary),
            validator,
            approval_timeout: Duration::minutes(DEFAULT_APPROVAL_TIMEOUT_MINUTES),
            state: SessionState::Collecting,
            history: Vec::new(),
            fields: Vec::new(),
            bindings: Vec::new(),
            skeleton: None,
            pending: None,
            document: None,
            violations: Vec::new(),
            insertions: Vec::new(),
        }
    }

    /// Replace the default resolver (threshold, suggestion count). The
    /// resolver must read the same dictionary the session inserts into.
    pub fn with_resolver(mut self, resolver: FieldResolver) -> Self {
        self.coordinator = InsertionCoordinator::new(resolver.dictionary().clone());
        self.resolver = resolver;
        self
    }

    pub fn with_approval_timeout(mut self, timeout: Duration) -> Self {
        self.approval_timeout = timeout;
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn history(&self) -> &[StateTransition] {
        &self.history
    }

    pub fn fields(&self) -> &[FieldRequest] {
        &self.fields
    }

    /// Row bound to the request at `index`, if any yet.
    pub fn binding(&self, index: usize) -> Option<&CdrRow> {
        self.bindings.get(index).and_then(Option::as_ref)
    }

    pub fn bound_count(&self) -> usize {
        self.bindings.iter().filter(|b| b.is_some()).count()
    }

    pub fn pending(&self) -> Option<&PendingDecision> {
        self.pending.as_ref()
    }

    pub fn document(&self) -> Option<&DocumentModel> {
        self.document.as_ref()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Rows this session added to the dictionary.
    pub fn insertions(&self) -> &[InsertionReceipt] {
        &self.insertions
    }

    pub fn approval_timeout(&self) -> Duration {
        self.approval_timeout
    }

    // ------------------------------------------------------------------
    // Collecting
    // ------------------------------------------------------------------

    pub fn add_field(&mut self, request: FieldRequest) -> Result<(), SessionError> {
        self.require_state("add a field", SessionState::Collecting)?;
        for (name, value) in [
            ("concept", &request.concept),
            ("context", &request.context),
            ("field_name", &request.field_name),
        ] {
            if value.trim().is_empty() {
                return Err(SessionError::InvalidField(format!("{} is required", name)));
            }
        }
        debug!(session = %self.id, field = %request.label(), "Field requested");
        self.fields.push(request);
        self.bindings.push(None);
        Ok(())
    }

    pub fn set_skeleton(&mut self, skeleton: DocumentSkeleton) -> Result<(), SessionError> {
        self.require_state("set the skeleton", SessionState::Collecting)?;
        self.skeleton = Some(skeleton);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Driving
    // ------------------------------------------------------------------

    /// Run until the session needs a decision or reaches a terminal state.
    pub fn advance(&mut self) -> Result<SessionStep, SessionError> {
        match self.state {
            SessionState::Collecting => {
                if self.fields.is_empty() {
                    return Err(SessionError::NoFields);
                }
                if self.skeleton.is_none() {
                    return Err(SessionError::NoSkeleton);
                }
                let reason = format!("{} field(s) collected", self.fields.len());
                self.transition(SessionState::Resolving, reason, None)?;
                self.resolve_remaining()
            }
            SessionState::Resolving => self.resolve_remaining(),
            SessionState::AwaitingApproval => {
                if self.expire_if_due(Utc::now()) {
                    return Ok(SessionStep::Cancelled {
                        reason: "approval expired".to_string(),
                    });
                }
                let pending = self.pending.clone().ok_or(SessionError::NoPendingDecision)?;
                Ok(SessionStep::NeedsDecision { pending })
            }
            SessionState::Validating => self.validate(),
            state => Err(SessionError::Terminal(state)),
        }
    }

    /// Apply a human decision to the pending field and continue.
    pub fn decide(&mut self, decision: Decision, actor: &str) -> Result<SessionStep, SessionError> {
        self.require_state("decide", SessionState::AwaitingApproval)?;
        let pending = self.pending.clone().ok_or(SessionError::NoPendingDecision)?;

        if pending.is_expired_at(Utc::now()) {
            self.expire(&pending, Some(actor))?;
            return Err(SessionError::DecisionExpired {
                approval_id: pending.approval_id,
                expired_at: pending.expires_at,
            });
        }

        match decision {
            Decision::SelectExisting(row) => {
                self.check_selection(&pending, &row)?;
                let reason = format!(
                    "'{}' bound to existing '{}'",
                    pending.field.label(),
                    row.long_name()
                );
                self.bind(pending.field_index, row);
                self.pending = None;
                self.transition(SessionState::Resolving, reason, Some(actor))?;
            }
            Decision::ApproveInsertion(request) => {
                if request.concept != pending.field.concept
                    || request.context != pending.field.context
                {
                    return Err(SessionError::InvalidDecision(format!(
                        "insertion targets {}:{} but the pending field is under {}:{}",
                        request.concept,
                        request.context,
                        pending.field.concept,
                        pending.field.context
                    )));
                }

                // Duplicate and persistence failures leave the decision pending.
                let receipt = match self.coordinator.insert(&request) {
                    Ok(receipt) => receipt,
                    Err(e) => {
                        warn!(session = %self.id, approval = %pending.approval_id, "Insertion failed: {}", e);
                        return Err(e.into());
                    }
                };

                let reason = format!(
                    "'{}' bound to inserted '{}' at slot {}",
                    pending.field.label(),
                    receipt.row.long_name(),
                    receipt.slot
                );
                self.bind(pending.field_index, receipt.row.clone());
                self.insertions.push(receipt);
                self.pending = None;
                self.transition(SessionState::Resolving, reason, Some(actor))?;
            }
            Decision::Abort { reason } => {
                self.cancel(reason.clone(), actor)?;
                return Ok(SessionStep::Cancelled { reason });
            }
        }

        self.advance()
    }

    /// Cancel from any non-terminal state. Never touches the dictionary.
    pub fn cancel(&mut self, reason: impl Into<String>, actor: &str) -> Result<(), SessionError> {
        let reason = reason.into();
        self.transition(SessionState::Cancelled, reason.clone(), Some(actor))?;
        self.drop_local_state();
        info!(session = %self.id, reason = %reason, "Session cancelled");
        Ok(())
    }

    /// Cancel the session if its pending decision has expired by `now`.
    pub fn expire_if_due(&mut self, now: DateTime<Utc>) -> bool {
        if self.state != SessionState::AwaitingApproval {
            return false;
        }
        let Some(pending) = self.pending.clone() else {
            return false;
        };
        if !pending.is_expired_at(now) {
            return false;
        }
        self.expire(&pending, None).is_ok()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn resolve_remaining(&mut self) -> Result<SessionStep, SessionError> {
        while let Some(index) = self.bindings.iter().position(Option::is_none) {
            let request = self.fields[index].clone();
            match self.resolver.resolve_request(&request) {
                Resolution::Exact { row } => {
                    debug!(session = %self.id, field = %request.label(), uid = %row.uid(), "Bound exact match");
                    self.bind(index, row);
                }
                Resolution::Suggestions { suggestions } => {
                    return self.suspend(index, request, suggestions);
                }
                Resolution::NoMatch => {
                    return self.suspend(index, request, Vec::new());
                }
            }
        }

        self.transition(
            SessionState::Validating,
            "all fields canonical".to_string(),
            None,
        )?;
        self.validate()
    }

    fn suspend(
        &mut self,
        index: usize,
        request: FieldRequest,
        suggestions: Vec<Suggestion>,
    ) -> Result<SessionStep, SessionError> {
        let pending = PendingDecision::new(request, index, suggestions, self.approval_timeout);
        let reason = if pending.is_no_match() {
            format!("no canonical match for '{}'", pending.field.label())
        } else {
            format!(
                "{} suggestion(s) for '{}'",
                pending.suggestions.len(),
                pending.field.label()
            )
        };
        self.transition(SessionState::AwaitingApproval, reason, None)?;
        info!(
            session = %self.id,
            approval = %pending.approval_id,
            field = %pending.field.label(),
            expires_at = %pending.expires_at,
            "Awaiting approval"
        );
        self.pending = Some(pending.clone());
        Ok(SessionStep::NeedsDecision { pending })
    }

    fn validate(&mut self) -> Result<SessionStep, SessionError> {
        let assembled = {
            let skeleton = self.skeleton.as_ref().ok_or(SessionError::NoSkeleton)?;
            bound_fields(&self.fields, &self.bindings).map(|bound| assemble(skeleton, &bound))
        };

        let document = match assembled {
            Ok(document) => document,
            Err(e) => {
                self.transition(SessionState::Failed, e.to_string(), None)?;
                warn!(session = %self.id, "Session failed: {}", e);
                return Err(e.into());
            }
        };

        let violations = self.validator.validate(&document);

        if violations.is_empty() {
            self.transition(SessionState::Ready, "document clean".to_string(), None)?;
            info!(session = %self.id, fields = self.fields.len(), "Document ready");
            self.document = Some(document.clone());
            Ok(SessionStep::Ready { document })
        } else {
            let reason = format!("{} structural violation(s)", violations.len());
            self.transition(SessionState::Rejected, reason, None)?;
            warn!(session = %self.id, count = violations.len(), "Document rejected");
            self.violations = violations.clone();
            Ok(SessionStep::Rejected { violations })
        }
    }

    fn check_selection(&self, pending: &PendingDecision, row: &CdrRow) -> Result<(), SessionError> {
        let canonical = self
            .resolver
            .dictionary()
            .find_by_uid(row.uid())
            .ok_or_else(|| {
                SessionError::InvalidDecision(format!("no canonical row with uid '{}'", row.uid()))
            })?;
        if &canonical != row {
            return Err(SessionError::InvalidDecision(format!(
                "row '{}' differs from the canonical row with uid '{}'",
                row.long_name(),
                row.uid()
            )));
        }
        if !pending.in_scope(row) {
            return Err(SessionError::InvalidDecision(format!(
                "'{}' is not under {}:{}",
                row.long_name(),
                pending.field.concept,
                pending.field.context
            )));
        }
        Ok(())
    }

    fn bind(&mut self, index: usize, row: CdrRow) {
        if let Some(slot) = self.bindings.get_mut(index) {
            *slot = Some(row);
        }
    }

    fn expire(&mut self, pending: &PendingDecision, actor: Option<&str>) -> Result<(), SessionError> {
        let reason = format!(
            "approval {} expired at {}",
            pending.approval_id, pending.expires_at
        );
        self.transition(SessionState::Cancelled, reason, actor)?;
        self.drop_local_state();
        warn!(session = %self.id, approval = %pending.approval_id, "Approval expired");
        Ok(())
    }

    fn drop_local_state(&mut self) {
        self.fields.clear();
        self.bindings.clear();
        self.skeleton = None;
        self.pending = None;
        self.document = None;
        self.violations.clear();
    }

    fn require_state(&self, operation: &'static str, expected: SessionState) -> Result<(), SessionError> {
        if self.state.is_terminal() {
            return Err(SessionError::Terminal(self.state));
        }
        if self.state != expected {
            return Err(SessionError::WrongState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    fn transition(
        &mut self,
        to: SessionState,
        reason: String,
        actor: Option<&str>,
    ) -> Result<(), SessionError> {
        if self.state.is_terminal() {
            return Err(SessionError::Terminal(self.state));
        }
        if !self.state.can_transition_to(to) {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to,
            });
        }

        let mut transition = StateTransition::new(self.state, to).with_reason(reason);
        if let Some(actor) = actor {
            transition = transition.with_actor(actor);
        }
        debug!(session = %self.id, from = %self.state, to = %to, "Session transition");
        self.state = to;
        self.history.push(transition);
        Ok(())
    }
}

/// Pair every request with its bound row, failing on the first gap.
fn bound_fields<'a>(
    fields: &'a [FieldRequest],
    bindings: &'a [Option<CdrRow>],
) -> Result<Vec<(&'a FieldRequest, &'a CdrRow)>, UnresolvedFieldError> {
    fields
        .iter()
        .enumerate()
        .map(|(index, request)| match bindings.get(index).and_then(Option::as_ref) {
            Some(row) => Ok((request, row)),
            None => Err(UnresolvedFieldError {
                index,
                label: request.label(),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::TypeShell;
    use cdr_dictionary::DataType;
    use cdr_ids::RowUid;
    use cdr_lint::TypeRole;

    fn row(name: &str, uid: &str) -> CdrRow {
        CdrRow::new(
            "Customer",
            "Contact",
            name,
            format!("{name} definition"),
            DataType::String,
            RowUid::parse(uid).unwrap(),
        )
        .unwrap()
    }

    fn session() -> GovernanceSession {
        let dictionary = CanonicalDictionary::with_rows(vec![
            row("emailAddress", "CDR-1"),
            row("smsNumber", "CDR-2"),
        ])
        .unwrap();
        let mut session = GovernanceSession::new(
            Arc::new(dictionary),
            Arc::new(StructuralValidator::default()),
        );
        session
            .set_skeleton(DocumentSkeleton {
                base_uri: "https://api.example.com/crm/v1".into(),
                security_schemes: vec!["oauth2".into()],
                types: vec![TypeShell::new("CustomerResponse", TypeRole::Response)],
                endpoints: Vec::new(),
            })
            .unwrap();
        session
    }

    #[test]
    fn transition_table() {
        assert!(SessionState::Collecting.can_transition_to(SessionState::Resolving));
        assert!(SessionState::AwaitingApproval.can_transition_to(SessionState::Resolving));
        assert!(!SessionState::Collecting.can_transition_to(SessionState::Ready));
        assert!(!SessionState::AwaitingApproval.can_transition_to(SessionState::Validating));
        for terminal in [
            SessionState::Ready,
            SessionState::Rejected,
            SessionState::Failed,
            SessionState::Cancelled,
        ] {
            assert!(terminal.is_terminal());
            assert!(terminal.valid_transitions().is_empty());
        }
    }

    #[test]
    fn advance_requires_fields_and_skeleton() {
        let mut s = session();
        assert!(matches!(s.advance(), Err(SessionError::NoFields)));

        let dictionary = Arc::new(CanonicalDictionary::in_memory());
        let mut bare = GovernanceSession::new(dictionary, Arc::new(StructuralValidator::default()));
        bare.add_field(FieldRequest::new("Customer", "Contact", "emailAddress", true))
            .unwrap();
        assert!(matches!(bare.advance(), Err(SessionError::NoSkeleton)));
    }

    #[test]
    fn blank_field_request_is_rejected() {
        let mut s = session();
        let err = s
            .add_field(FieldRequest::new("Customer", " ", "emailAddress", true))
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidField(_)));
    }

    #[test]
    fn exact_fields_reach_ready() {
        let mut s = session();
        s.add_field(FieldRequest::new("Customer", "Contact", "emailAddress", true))
            .unwrap();
        let step = s.advance().unwrap();
        assert!(matches!(step, SessionStep::Ready { .. }));
        let states: Vec<_> = s.history().iter().map(|t| t.to).collect();
        assert_eq!(
            states,
            vec![
                SessionState::Resolving,
                SessionState::Validating,
                SessionState::Ready
            ]
        );
    }

    #[test]
    fn operations_after_terminal_fail() {
        let mut s = session();
        s.add_field(FieldRequest::new("Customer", "Contact", "emailAddress", true))
            .unwrap();
        s.advance().unwrap();
        assert!(matches!(s.advance(), Err(SessionError::Terminal(SessionState::Ready))));
        assert!(matches!(
            s.add_field(FieldRequest::new("Customer", "Contact", "smsNumber", true)),
            Err(SessionError::Terminal(_))
        ));
        assert!(s.cancel("late", "tester").is_err());
    }

    #[test]
    fn select_out_of_scope_row_is_invalid() {
        let dictionary = CanonicalDictionary::with_rows(vec![
            row("smsNumber", "CDR-2"),
            CdrRow::new(
                "Account",
                "Contact",
                "mobileNumber",
                "Account mobile",
                DataType::String,
                RowUid::parse("CDR-9").unwrap(),
            )
            .unwrap(),
        ])
        .unwrap();
        let mut s = GovernanceSession::new(
            Arc::new(dictionary),
            Arc::new(StructuralValidator::default()),
        );
        s.add_field(FieldRequest::new("Customer", "Contact", "mobileNumber", true))
            .unwrap();
        s.set_skeleton(DocumentSkeleton::default()).unwrap();
        s.advance().unwrap();

        let foreign = s.resolver.dictionary().find_by_uid(&RowUid::parse("CDR-9").unwrap()).unwrap();
        let err = s.decide(Decision::SelectExisting(foreign), "steward").unwrap_err();
        assert!(matches!(err, SessionError::InvalidDecision(_)));
        assert_eq!(s.state(), SessionState::AwaitingApproval);
    }

    #[test]
    fn select_forged_row_is_invalid() {
        let mut s = session();
        s.add_field(FieldRequest::new("Customer", "Contact", "mobileNumber", true))
            .unwrap();
        s.advance().unwrap();

        // Same uid as smsNumber, different content.
        let forged = row("mobileNumber", "CDR-2");
        let err = s.decide(Decision::SelectExisting(forged), "steward").unwrap_err();
        assert!(matches!(err, SessionError::InvalidDecision(_)));
        assert!(s.pending().is_some());
    }

    #[test]
    fn decide_outside_approval_is_wrong_state() {
        let mut s = session();
        let err = s
            .decide(
                Decision::Abort {
                    reason: "nothing".into(),
                },
                "steward",
            )
            .unwrap_err();
        assert!(matches!(err, SessionError::WrongState { .. }));
    }

    #[test]
    fn missing_binding_is_unresolved() {
        let fields = vec![
            FieldRequest::new("Customer", "Contact", "emailAddress", true),
            FieldRequest::new("Customer", "Contact", "mobileNumber", true),
        ];
        let bindings = vec![Some(row("emailAddress", "CDR-1")), None];
        let err = bound_fields(&fields, &bindings).unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.label, "Customer:Contact:mobileNumber");
    }

    #[test]
    fn step_serializes_with_status_tag() {
        let step = SessionStep::Cancelled {
            reason: "aborted".into(),
        };
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["status"], "cancelled");
        assert_eq!(step.state(), SessionState::Cancelled);
    }
}
