//! Lint command - run the structural rules over a document model

use crate::cli::config::load_config;
use crate::cli::error::HelpfulError;
use crate::cli::output::print_violations;
use crate::cli::EXIT_VIOLATIONS;
use cdr_lint::{DocumentModel, RuleRegistry, StructuralValidator};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

/// Arguments for the lint command
#[derive(Debug)]
pub struct LintArgs {
    pub file: PathBuf,
    pub disabled: Vec<String>,
    pub json: bool,
}

/// Execute the lint command
pub fn run(args: LintArgs) -> anyhow::Result<ExitCode> {
    let document = read_document(&args.file)?;
    let config = load_config()?;

    let mut registry = RuleRegistry::with_default_rules();
    registry
        .disable_all(config.lint.disabled_rules.iter().chain(args.disabled.iter()))
        .map_err(|e| {
            HelpfulError::new(e.to_string())
                .with_suggestion("TRY: List valid rule ids with `cdr rules`")
        })?;
    let validator = StructuralValidator::new(registry);
    let enabled = validator.registry().enabled_rules().count();

    let violations = validator.validate(&document);
    info!(
        file = %args.file.display(),
        rules = enabled,
        violations = violations.len(),
        "Linted document"
    );

    if args.json {
        let output = serde_json::json!({
            "file": args.file.to_string_lossy(),
            "rules_run": enabled,
            "clean": violations.is_empty(),
            "violations": violations,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if violations.is_empty() {
        println!("OK: {} ({} rules, no violations)", args.file.display(), enabled);
    } else {
        print_violations(&violations);
        println!();
        println!(
            "{} violation(s) in {} ({} rules)",
            violations.len(),
            args.file.display(),
            enabled
        );
    }

    if violations.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_VIOLATIONS))
    }
}

pub(crate) fn read_document(path: &Path) -> anyhow::Result<DocumentModel> {
    if !path.exists() {
        return Err(HelpfulError::file_not_found(path).into());
    }
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text)
        .map_err(|e| HelpfulError::json_parse_error(path, &e.to_string()).into())
}
