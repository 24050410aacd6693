//! Canonical field governance.
//!
//! A [`GovernanceSession`] takes proposed fields under (concept, context)
//! pairs and a document skeleton, binds every field to a canonical
//! dictionary row, and emits the assembled document only when the
//! structural validator finds nothing wrong with it.
//!
//! - [`FieldResolver`] finds exact matches and ranks near misses.
//! - [`InsertionCoordinator`] adds approved fields without ever leaving a
//!   partial row behind.
//! - Unresolved fields suspend the session on a [`PendingDecision`] until a
//!   human [`Decision`] arrives or the decision expires.

pub mod approval;
pub mod assembly;
pub mod config;
pub mod insertion;
pub mod resolver;
pub mod session;
pub mod similarity;

pub use approval::{Decision, PendingDecision, DEFAULT_APPROVAL_TIMEOUT_MINUTES};
pub use assembly::{assemble, DocumentSkeleton, TypeShell};
pub use config::{
    ConfigError, GovernanceConfig, LintConfig, ResolverConfig, SessionConfig,
    MAX_APPROVAL_TIMEOUT_MINUTES,
};
pub use insertion::{
    InsertionCoordinator, InsertionError, InsertionReceipt, InsertionRequest, PersistenceError,
};
pub use resolver::{passes_threshold, FieldRequest, FieldResolver, Resolution, Suggestion};
pub use session::{
    GovernanceSession, SessionError, SessionState, SessionStep, StateTransition,
    UnresolvedFieldError,
};
pub use similarity::{similarity, DEFAULT_MAX_SUGGESTIONS, SUGGESTION_THRESHOLD};
