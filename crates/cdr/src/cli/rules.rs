//! Rules command - list the structural rule catalog

use crate::cli::config::load_config;
use crate::cli::error::HelpfulError;
use crate::cli::output::print_table_colored;
use cdr_lint::{Rule, RuleFamily, RuleRegistry};
use comfy_table::Color;
use std::process::ExitCode;

const FAMILIES: [RuleFamily; 4] = [
    RuleFamily::Naming,
    RuleFamily::Nesting,
    RuleFamily::Http,
    RuleFamily::CrossCutting,
];

/// Arguments for the rules command
#[derive(Debug)]
pub struct RulesArgs {
    pub family: Option<String>,
    pub json: bool,
}

/// Execute the rules command
pub fn run(args: RulesArgs) -> anyhow::Result<ExitCode> {
    let family = args.family.as_deref().map(parse_family).transpose()?;
    let config = load_config()?;

    let mut registry = RuleRegistry::with_default_rules();
    // Unknown ids in config are reported by `cdr lint`; here they just stay enabled.
    for id in &config.lint.disabled_rules {
        let _ = registry.disable(id);
    }

    let rules: Vec<&dyn Rule> = registry
        .rules()
        .filter(|r| family.map_or(true, |f| r.family() == f))
        .collect();

    if args.json {
        let output: Vec<_> = rules
            .iter()
            .map(|r| {
                serde_json::json!({
                    "id": r.id(),
                    "family": r.family(),
                    "severity": r.severity(),
                    "enabled": registry.is_enabled(r.id()),
                    "description": r.description(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(ExitCode::SUCCESS);
    }

    let rows = rules
        .iter()
        .map(|r| {
            let enabled = registry.is_enabled(r.id());
            vec![
                (r.id().to_string(), None),
                (r.family().to_string(), None),
                (r.severity().to_string(), None),
                if enabled {
                    ("yes".to_string(), Some(Color::Green))
                } else {
                    ("no".to_string(), Some(Color::DarkGrey))
                },
                (r.description().to_string(), None),
            ]
        })
        .collect();
    print_table_colored(&["ID", "FAMILY", "SEVERITY", "ENABLED", "DESCRIPTION"], rows);
    println!();
    println!("{} rule(s)", rules.len());

    Ok(ExitCode::SUCCESS)
}

fn parse_family(value: &str) -> anyhow::Result<RuleFamily> {
    let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
    FAMILIES
        .iter()
        .copied()
        .find(|f| f.as_str() == normalized)
        .ok_or_else(|| {
            HelpfulError::new(format!("Unknown rule family: {}", value))
                .with_suggestion("TRY: --family naming | nesting | http | cross-cutting")
                .into()
        })
}
