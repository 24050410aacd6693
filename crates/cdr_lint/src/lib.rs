//! Structural and naming rule validator for CDR-governed API documents.
//!
//! The validator runs a registry of independent rules over a
//! [`DocumentModel`] and reports every violation it finds. It never stops at
//! the first finding and never looks at the dictionary.
//!
//! Rule families:
//! - naming (`NAM-*`): property, type and URI naming
//! - nesting (`NST-*`): concept -> context -> field property trees
//! - http (`HTTP-*`): method semantics and status codes
//! - cross-cutting (`XC-*`): caching, pagination, security, correlation, base URI

pub mod document;
pub mod registry;
pub mod rule;
pub mod rules;
pub mod validator;
pub mod violation;

pub use document::{
    DocumentModel, Endpoint, FieldRef, HttpMethod, Intent, PathSegment, Property, TypeDef,
    TypeRole,
};
pub use registry::{RegistryError, RuleRegistry};
pub use rule::{BuiltinRule, CheckFn, Findings, Rule, RuleFamily};
pub use validator::StructuralValidator;
pub use violation::{Severity, ValidationFailure, Violation};
