//! Resolve command - look up a proposed field in the dictionary

use crate::cli::config::{dictionary_path, load_config, open_dictionary};
use crate::cli::error::HelpfulError;
use crate::cli::output::{format_score, print_table, truncate};
use cdr_dictionary::CdrRow;
use cdr_governance::{FieldRequest, Resolution};
use std::path::PathBuf;
use std::process::ExitCode;

/// Arguments for the resolve command
#[derive(Debug)]
pub struct ResolveArgs {
    pub dictionary: Option<PathBuf>,
    pub concept: String,
    pub context: String,
    pub field_name: String,
    pub threshold: Option<f64>,
    pub limit: Option<usize>,
    pub json: bool,
}

/// Execute the resolve command
pub fn run(args: ResolveArgs) -> anyhow::Result<ExitCode> {
    if let Some(threshold) = args.threshold {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(HelpfulError::new(format!("Invalid threshold: {}", threshold))
                .with_context("Similarity scores range from 0.0 to 1.0")
                .with_suggestion("TRY: --threshold 0.4")
                .into());
        }
    }
    if args.limit == Some(0) {
        return Err(HelpfulError::new("Invalid limit: 0")
            .with_suggestion("TRY: --limit 5")
            .into());
    }

    let config = load_config()?;
    let path = dictionary_path(args.dictionary, &config);
    let dictionary = open_dictionary(&path)?;

    let mut resolver = config.build_resolver(dictionary);
    if let Some(threshold) = args.threshold {
        resolver = resolver.with_threshold(threshold);
    }
    if let Some(limit) = args.limit {
        resolver = resolver.with_max_suggestions(limit);
    }

    let request = FieldRequest::new(args.concept, args.context, args.field_name, false);
    let resolution = resolver.resolve_request(&request);

    if args.json {
        let output = serde_json::json!({
            "request": request,
            "threshold": resolver.threshold(),
            "resolution": resolution,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(ExitCode::SUCCESS);
    }

    match &resolution {
        Resolution::Exact { row } => {
            println!("EXACT MATCH: {}", row.long_name());
            println!();
            print_row(row);
        }
        Resolution::Suggestions { suggestions } => {
            println!(
                "No exact match for {}. {} suggestion(s):",
                request.label(),
                suggestions.len()
            );
            println!();
            let rows = suggestions
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
            println!();
            println!("Reuse one of these fields, or request a new one with `cdr insert`.");
        }
        Resolution::NoMatch => {
            println!(
                "No match for {} (threshold {}).",
                request.label(),
                format_score(resolver.threshold())
            );
            println!();
            println!(
                "Request a new field: cdr insert {} {} {} --definition TEXT --type TYPE --uid UID",
                request.concept, request.context, request.field_name
            );
        }
    }

    Ok(ExitCode::SUCCESS)
}

pub(crate) fn print_row(row: &CdrRow) {
    println!("  Long name:   {}", row.long_name());
    println!("  UID:         {}", row.uid());
    println!("  Data type:   {}", row.data_type());
    println!("  Definition:  {}", row.definition());
}
