//! Session command - run a governance session from files
//!
//! The request file holds the proposed fields and the document skeleton:
//!
//! ```json
//! {
//!   "fields": [
//!     {"concept": "Customer", "context": "Contact", "field_name": "emailAddress", "required": true}
//!   ],
//!   "skeleton": {"base_uri": "https://api.example.com/customers/v1", "types": [], "endpoints": []}
//! }
//! ```
//!
//! The optional decisions file is a JSON array consumed in order, one entry
//! per pending field:
//!
//! ```json
//! [
//!   {"action": "select", "uid": "CDR-0002"},
//!   {"action": "insert", "definition": "Nickname", "data_type": "string", "uid": "CDR-0100"},
//!   {"action": "abort", "reason": "wrong concept"}
//! ]
//! ```
//!
//! When the decisions run out with a field still pending, the session stops
//! and the pending decision is reported.

use crate::cli::config::{dictionary_path, load_config, open_dictionary};
use crate::cli::error::HelpfulError;
use crate::cli::output::{format_score, format_timestamp, print_table, print_violations, truncate};
use crate::cli::{EXIT_AWAITING_DECISION, EXIT_CANCELLED, EXIT_VIOLATIONS};
use cdr_dictionary::{CanonicalDictionary, DataType};
use cdr_governance::{
    Decision, DocumentSkeleton, FieldRequest, GovernanceSession, InsertionRequest,
    PendingDecision, SessionStep,
};
use cdr_ids::RowUid;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

/// Arguments for the session command
#[derive(Debug)]
pub struct SessionArgs {
    pub dictionary: Option<PathBuf>,
    pub request: PathBuf,
    pub decisions: Option<PathBuf>,
    pub actor: String,
    pub output: Option<PathBuf>,
    pub json: bool,
}

#[derive(Debug, Deserialize)]
struct SessionRequest {
    fields: Vec<FieldRequest>,
    #[serde(default)]
    skeleton: DocumentSkeleton,
}

/// One scripted answer to a pending decision.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ScriptedDecision {
    /// Bind the pending field to an existing row.
    Select {
        uid: String,
        #[serde(default)]
        field: Option<String>,
    },
    /// Insert a new row under the pending field's concept and context.
    Insert {
        definition: String,
        data_type: DataType,
        uid: String,
        #[serde(default)]
        field_name: Option<String>,
        #[serde(default)]
        approved_by: Option<String>,
        #[serde(default)]
        field: Option<String>,
    },
    Abort { reason: String },
}

impl ScriptedDecision {
    /// The field name this entry is meant for, when it names one.
    fn target(&self) -> Option<&str> {
        match self {
            ScriptedDecision::Select { field, .. } | ScriptedDecision::Insert { field, .. } => {
                field.as_deref()
            }
            ScriptedDecision::Abort { .. } => None,
        }
    }

    fn into_decision(
        self,
        pending: &PendingDecision,
        dictionary: &CanonicalDictionary,
        actor: &str,
    ) -> anyhow::Result<Decision> {
        match self {
            ScriptedDecision::Select { uid, .. } => {
                let parsed = RowUid::parse(&uid)
                    .map_err(|e| HelpfulError::new(format!("Invalid uid '{}': {}", uid, e)))?;
                let row = dictionary.find_by_uid(&parsed).ok_or_else(|| {
                    HelpfulError::new(format!("No dictionary row has uid {}", uid))
                        .with_context(format!("Selecting a row for {}", pending.field.label()))
                        .with_suggestion(format!(
                            "TRY: cdr resolve {} {} {}",
                            pending.field.concept, pending.field.context, pending.field.field_name
                        ))
                })?;
                Ok(Decision::SelectExisting(row))
            }
            ScriptedDecision::Insert {
                definition,
                data_type,
                uid,
                field_name,
                approved_by,
                ..
            } => {
                let request = InsertionRequest::new(
                    pending.field.concept.clone(),
                    pending.field.context.clone(),
                    field_name.unwrap_or_else(|| pending.field.field_name.clone()),
                    definition,
                    data_type,
                    uid,
                )
                .approved_by(approved_by.unwrap_or_else(|| actor.to_string()));
                Ok(Decision::ApproveInsertion(request))
            }
            ScriptedDecision::Abort { reason } => Ok(Decision::Abort { reason }),
        }
    }
}

/// Execute the session command
pub fn run(args: SessionArgs) -> anyhow::Result<ExitCode> {
    let request: SessionRequest = read_json(&args.request)?;
    let scripted: Vec<ScriptedDecision> = match &args.decisions {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };

    let config = load_config()?;
    let path = dictionary_path(args.dictionary, &config);
    let dictionary = open_dictionary(&path)?;
    let validator = config.build_validator().map_err(|e| {
        HelpfulError::invalid_config(&cdr_logging::config_path(), &e.to_string())
    })?;
    let approval_timeout = config.approval_timeout().map_err(|e| {
        HelpfulError::invalid_config(&cdr_logging::config_path(), &e.to_string())
    })?;

    let mut session = GovernanceSession::new(dictionary.clone(), Arc::new(validator))
        .with_resolver(config.build_resolver(dictionary.clone()))
        .with_approval_timeout(approval_timeout);

    for field in request.fields {
        session.add_field(field)?;
    }
    session.set_skeleton(request.skeleton)?;

    let mut step = session.advance()?;
    let mut remaining = scripted.into_iter().enumerate();
    while let SessionStep::NeedsDecision { pending } = &step {
        let Some((index, entry)) = remaining.next() else {
            break;
        };
        if let Some(target) = entry.target() {
            if target != pending.field.field_name {
                return Err(HelpfulError::new(format!(
                    "Decision {} is for '{}' but '{}' is pending",
                    index + 1,
                    target,
                    pending.field.label()
                ))
                .with_suggestion("TRY: Order the decisions file to match the request fields")
                .into());
            }
        }
        let decision = entry.into_decision(pending, &dictionary, &args.actor)?;
        info!(
            session = %session.id(),
            field = %pending.field.label(),
            decision = decision.kind(),
            "Applying scripted decision"
        );
        step = session.decide(decision, &args.actor)?;
    }

    if let (SessionStep::Ready { document }, Some(output)) = (&step, &args.output) {
        std::fs::write(output, serde_json::to_string_pretty(document)?)?;
        info!(path = %output.display(), "Wrote document");
    }

    if args.json {
        let output = serde_json::json!({
            "session_id": session.id().to_string(),
            "state": session.state(),
            "history": session.history(),
            "step": step,
            "insertions": session.insertions(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_history(&session);
        println!();
        print_step(&step, args.output.as_deref());
    }

    Ok(exit_code(&step))
}

fn exit_code(step: &SessionStep) -> ExitCode {
    match step {
        SessionStep::Ready { .. } => ExitCode::SUCCESS,
        SessionStep::Rejected { .. } => ExitCode::from(EXIT_VIOLATIONS),
        SessionStep::NeedsDecision { .. } => ExitCode::from(EXIT_AWAITING_DECISION),
        SessionStep::Cancelled { .. } => ExitCode::from(EXIT_CANCELLED),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    if !path.exists() {
        return Err(HelpfulError::file_not_found(path).into());
    }
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text)
        .map_err(|e| HelpfulError::json_parse_error(path, &e.to_string()).into())
}

fn print_history(session: &GovernanceSession) {
    println!("SESSION {}", session.id());
    println!();
    let rows = session
        .history()
        .iter()
        .map(|t| {
            vec![
                format_timestamp(&t.timestamp),
                t.from.to_string(),
                t.to.to_string(),
                t.actor.clone().unwrap_or_else(|| "-".to_string()),
                t.reason.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["TIME", "FROM", "TO", "ACTOR", "REASON"], rows);
}

fn print_step(step: &SessionStep, output: Option<&Path>) {
    match step {
        SessionStep::Ready { document } => {
            println!(
                "READY: {} ({} type(s), {} endpoint(s))",
                document.base_uri,
                document.types.len(),
                document.endpoints.len()
            );
            match output {
                Some(path) => println!("Document written to {}", path.display()),
                None => println!("Pass --output FILE to write the document."),
            }
        }
        SessionStep::Rejected { violations } => {
            println!("REJECTED: {} violation(s)", violations.len());
            println!();
            print_violations(violations);
        }
        SessionStep::NeedsDecision { pending } => {
            println!("AWAITING DECISION for {}", pending.field.label());
            println!("  Approval:  {}", pending.approval_id);
            println!("  Expires:   {}", format_timestamp(&pending.expires_at));
            println!();
            if pending.is_no_match() {
                println!("No similar fields. Add an insert decision for this field.");
            } else {
                let rows = pending
                    .suggestions
                    .iter()
                    .map(|s| {
                        vec![
                            s.row.long_name().to_string(),
                            s.row.uid().to_string(),
                            format_score(s.score),
                            truncate(s.row.definition(), 60),
                        ]
                    })
                    .collect();
                print_table(&["LONG NAME", "UID", "SCORE", "DEFINITION"], rows);
            }
        }
        SessionStep::Cancelled { reason } => {
            println!("CANCELLED: {}", reason);
        }
    }
}
