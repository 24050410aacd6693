//! Configuration for the `cdr` binary
//!
//! All paths live under the CDR home directory (`CDR_HOME`, default
//! `~/.cdr_governance`). Command-line flags override `config.toml`.

use crate::cli::error::HelpfulError;
use cdr_dictionary::{CanonicalDictionary, CsvStore, DictionaryStore};
use cdr_governance::GovernanceConfig;
use cdr_logging::{cdr_home, config_path, default_dictionary_path, logs_dir};
use clap::Subcommand;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

/// Subcommands for configuration
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show resolved paths and settings
    Show {
        #[arg(long)]
        json: bool,
    },
    /// Write a config.toml with default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl ConfigAction {
    pub fn wants_json(&self) -> bool {
        matches!(self, ConfigAction::Show { json: true })
    }
}

/// Load `config.toml`, or defaults when it does not exist
pub fn load_config() -> anyhow::Result<GovernanceConfig> {
    let path = config_path();
    GovernanceConfig::load(&path)
        .map_err(|e| HelpfulError::invalid_config(&path, &e.to_string()).into())
}

/// Dictionary path: `--dictionary`, then config.toml, then the home default
pub fn dictionary_path(flag: Option<PathBuf>, config: &GovernanceConfig) -> PathBuf {
    flag.or_else(|| config.dictionary_path.clone())
        .unwrap_or_else(default_dictionary_path)
}

/// Open the CSV dictionary, creating an empty one if the file is missing
pub fn open_dictionary(path: &Path) -> anyhow::Result<Arc<CanonicalDictionary>> {
    let store: Arc<dyn DictionaryStore> = Arc::new(
        CsvStore::open(path)
            .map_err(|e| HelpfulError::dictionary_unavailable(path, &e.to_string()))?,
    );
    let dictionary = CanonicalDictionary::open(store)
        .map_err(|e| HelpfulError::dictionary_unavailable(path, &e.to_string()))?;
    Ok(Arc::new(dictionary))
}

/// Run the config command
pub fn run(action: ConfigAction, dictionary: Option<PathBuf>) -> anyhow::Result<ExitCode> {
    match action {
        ConfigAction::Show { json } => show(dictionary, json),
        ConfigAction::Init { force } => init(force),
    }
}

fn show(dictionary: Option<PathBuf>, json: bool) -> anyhow::Result<ExitCode> {
    let home = cdr_home();
    let config_file = config_path();
    let config = load_config()?;
    let dictionary = dictionary_path(dictionary, &config);
    let logs = logs_dir();

    if json {
        let output = serde_json::json!({
            "home": home.to_string_lossy(),
            "config": {
                "path": config_file.to_string_lossy(),
                "exists": config_file.exists(),
            },
            "dictionary": {
                "path": dictionary.to_string_lossy(),
                "exists": dictionary.exists(),
            },
            "logs": logs.to_string_lossy(),
            "resolver": config.resolver,
            "session": config.session,
            "lint": config.lint,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("CDR CONFIGURATION");
    println!("=================");
    println!();
    println!("Home:        {}", home.display());
    println!(
        "Config:      {} ({})",
        config_file.display(),
        if config_file.exists() { "exists" } else { "defaults" }
    );
    println!(
        "Dictionary:  {} ({})",
        dictionary.display(),
        if dictionary.exists() { "exists" } else { "not found" }
    );
    println!("Logs:        {}", logs.display());
    println!();
    println!("Resolver threshold:      {}", config.resolver.threshold);
    println!("Max suggestions:         {}", config.resolver.max_suggestions);
    println!(
        "Approval timeout:        {} minutes",
        config.session.approval_timeout_minutes
    );
    if config.lint.disabled_rules.is_empty() {
        println!("Disabled rules:          none");
    } else {
        println!(
            "Disabled rules:          {}",
            config.lint.disabled_rules.join(", ")
        );
    }

    Ok(ExitCode::SUCCESS)
}

fn init(force: bool) -> anyhow::Result<ExitCode> {
    let path = config_path();
    if path.exists() && !force {
        return Err(HelpfulError::new(format!(
            "Config already exists: {}",
            path.display()
        ))
        .with_suggestion("TRY: cdr config init --force to overwrite it")
        .into());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let text = GovernanceConfig::default().to_toml_string()?;
    std::fs::write(&path, text)?;
    info!(path = %path.display(), "Wrote default config");
    println!("Wrote {}", path.display());

    Ok(ExitCode::SUCCESS)
}
