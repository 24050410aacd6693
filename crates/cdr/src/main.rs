//! `cdr` - canonical field governance from the command line
//!
//! Resolves proposed fields against the CDR dictionary, records approved
//! insertions, lints API documents and runs scripted governance sessions.

use anyhow::Result;
use cdr_dictionary::DataType;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod cli;

#[derive(Parser, Debug)]
#[command(name = "cdr", about = "Canonical field governance for API documents", version)]
struct Cli {
    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Dictionary CSV file (overrides config.toml)
    #[arg(long, global = true, env = "CDR_DICTIONARY")]
    dictionary: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve a proposed field against the dictionary
    Resolve {
        /// Concept, e.g. Customer
        concept: String,

        /// Context within the concept, e.g. Contact
        context: String,

        /// Proposed field name, e.g. mobileNumber
        field_name: String,

        /// Minimum suggestion score (overrides config)
        #[arg(long)]
        threshold: Option<f64>,

        /// Maximum number of suggestions (overrides config)
        #[arg(long)]
        limit: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Insert an approved canonical field
    Insert {
        concept: String,

        context: String,

        /// Canonical camelCase field name
        field_name: String,

        /// Definition copied verbatim into generated documents
        #[arg(long)]
        definition: String,

        /// string, boolean, datetime, enum, object or array
        #[arg(long = "type")]
        data_type: DataType,

        /// Steward-issued unique identifier
        #[arg(long)]
        uid: String,

        /// Expected long name; rejected if it disagrees with the derivation
        #[arg(long)]
        long_name: Option<String>,

        /// Approver recorded with the insertion
        #[arg(long)]
        approved_by: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a document model (JSON) against the structural rules
    Lint {
        /// Document model file
        file: PathBuf,

        /// Rule ids to skip, in addition to config.toml
        #[arg(long = "disable")]
        disabled: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the structural rules
    Rules {
        /// Only rules of this family (naming, nesting, http, cross-cutting)
        #[arg(long)]
        family: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a governance session from a request file
    Session {
        /// Request file: fields and document skeleton (JSON)
        request: PathBuf,

        /// Scripted decisions, applied in order to each pending field (JSON)
        #[arg(long)]
        decisions: Option<PathBuf>,

        /// Actor recorded in the session history
        #[arg(long, default_value = "cli")]
        actor: String,

        /// Write the emitted document here
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or initialize configuration
    Config {
        #[command(subcommand)]
        action: cli::config::ConfigAction,
    },
}

impl Commands {
    fn wants_json(&self) -> bool {
        match self {
            Commands::Resolve { json, .. }
            | Commands::Insert { json, .. }
            | Commands::Lint { json, .. }
            | Commands::Rules { json, .. }
            | Commands::Session { json, .. } => *json,
            Commands::Config { action } => action.wants_json(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let json_mode = cli.command.wants_json();

    let _log_guard = match cdr_logging::init_logging(cdr_logging::LogConfig {
        app_name: "cdr",
        verbose: cli.verbose,
    }) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("Warning: failed to initialize logging: {:#}", err);
            None
        }
    };

    match run_command(cli) {
        Ok(code) => code,
        Err(err) => {
            if json_mode {
                cli::error::print_json_error(&err);
            } else {
                eprintln!("{:?}", err);
            }
            ExitCode::from(cli::EXIT_ERROR)
        }
    }
}

fn run_command(cli: Cli) -> Result<ExitCode> {
    let dictionary = cli.dictionary;
    match cli.command {
        Commands::Resolve {
            concept,
            context,
            field_name,
            threshold,
            limit,
            json,
        } => cli::resolve::run(cli::resolve::ResolveArgs {
            dictionary,
            concept,
            context,
            field_name,
            threshold,
            limit,
            json,
        }),
        Commands::Insert {
            concept,
            context,
            field_name,
            definition,
            data_type,
            uid,
            long_name,
            approved_by,
            json,
        } => cli::insert::run(cli::insert::InsertArgs {
            dictionary,
            concept,
            context,
            field_name,
            definition,
            data_type,
            uid,
            long_name,
            approved_by,
            json,
        }),
        Commands::Lint {
            file,
            disabled,
            json,
        } => cli::lint::run(cli::lint::LintArgs {
            file,
            disabled,
            json,
        }),
        Commands::Rules { family, json } => cli::rules::run(cli::rules::RulesArgs { family, json }),
        Commands::Session {
            request,
            decisions,
            actor,
            output,
            json,
        } => cli::session::run(cli::session::SessionArgs {
            dictionary,
            request,
            decisions,
            actor,
            output,
            json,
        }),
        Commands::Config { action } => cli::config::run(action, dictionary),
    }
}
