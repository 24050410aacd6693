//! Insert command - add an approved canonical field

use crate::cli::config::{dictionary_path, load_config, open_dictionary};
use crate::cli::error::HelpfulError;
use crate::cli::output::format_timestamp;
use crate::cli::resolve::print_row;
use cdr_dictionary::DataType;
use cdr_governance::{InsertionCoordinator, InsertionError, InsertionRequest};
use std::path::PathBuf;
use std::process::ExitCode;

/// Arguments for the insert command
#[derive(Debug)]
pub struct InsertArgs {
    pub dictionary: Option<PathBuf>,
    pub concept: String,
    pub context: String,
    pub field_name: String,
    pub definition: String,
    pub data_type: DataType,
    pub uid: String,
    pub long_name: Option<String>,
    pub approved_by: Option<String>,
    pub json: bool,
}

/// Execute the insert command
pub fn run(args: InsertArgs) -> anyhow::Result<ExitCode> {
    let config = load_config()?;
    let path = dictionary_path(args.dictionary, &config);
    let dictionary = open_dictionary(&path)?;
    let coordinator = InsertionCoordinator::new(dictionary);

    let mut request = InsertionRequest::new(
        args.concept,
        args.context,
        args.field_name,
        args.definition,
        args.data_type,
        args.uid,
    );
    if let Some(long_name) = args.long_name {
        request = request.with_long_name(long_name);
    }
    if let Some(approver) = args.approved_by {
        request = request.approved_by(approver);
    }

    let receipt = coordinator
        .insert(&request)
        .map_err(|e| explain(&request, e))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&receipt)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("INSERTED {} at slot {}", receipt.row.long_name(), receipt.slot);
    println!();
    print_row(&receipt.row);
    if let Some(approver) = &receipt.approved_by {
        println!("  Approved by: {}", approver);
    }
    println!("  Committed:   {}", format_timestamp(&receipt.committed_at));

    Ok(ExitCode::SUCCESS)
}

fn explain(request: &InsertionRequest, err: InsertionError) -> anyhow::Error {
    match err {
        InsertionError::Duplicate(duplicate) => HelpfulError::new(duplicate.to_string())
            .with_context(format!(
                "Inserting {} would duplicate an existing row",
                request.derived_long_name()
            ))
            .with_suggestions([
                format!(
                    "TRY: Reuse the existing field: cdr resolve {} {} {}",
                    request.concept, request.context, request.field_name
                ),
                "TRY: Ask the steward for a fresh uid".to_string(),
            ])
            .into(),
        InsertionError::InvalidRequest(details) => HelpfulError::new(details)
            .with_context(format!("Request for {}", request.derived_long_name()))
            .with_suggestion("TRY: Field names are camelCase, e.g. mobileNumber")
            .into(),
        other => anyhow::Error::new(other).context("Insertion failed; the dictionary is unchanged"),
    }
}
