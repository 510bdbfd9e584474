//! Edict: durable decision memory for AI agents
//!
//! **Edict is a local-first decision log that agents consult instead of
//! re-deciding.**
//!
//! Agents lose their working context between sessions; the decisions made
//! inside that context should not die with it. Edict keeps them in an
//! append-only event log under the project, replays that log into an
//! in-memory view on demand, and hands the active set back as a compact
//! text block.
//!
//! # Core Principles
//!
//! - **Local-first**: all state lives under `.edict/` in the project
//! - **Deterministic**: the log is the source of truth; views are replayed
//! - **Append-only**: edits, status changes, and removals are events too
//! - **Agent-first**: every command has `--format json`
//!
//! # Subsystems
//!
//! - `memory`: record, search, supersede, and sweep decisions
//! - `capture`: extract and classify decisions from prompt text
//! - `classifier`: rule tables with optional external blending
//! - `context`: render the active set as a bounded context block
//!
//! # Examples
//!
//! ```bash
//! # Initialize a project
//! edict init
//!
//! # Record a decision
//! edict memory add "Use Postgres for persistence"
//!
//! # Scan a prompt and capture what it decides
//! edict capture run --prompt "Decision: pin Rust to the 2024 edition" --yes
//!
//! # Inject the active set into an agent's context
//! edict context
//! ```

pub mod core;
pub mod plugins;

use crate::core::error::EdictError;
use crate::core::store::Store;
use crate::plugins::{capture, classifier, context, memory};

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[clap(
    name = "edict",
    version = env!("CARGO_PKG_VERSION"),
    about = "Durable decision memory for AI agents"
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize decision memory in a directory
    #[clap(name = "init")]
    Init {
        /// Directory to initialize (defaults to current working directory).
        #[clap(short, long)]
        dir: Option<PathBuf>,
    },

    /// Show version information
    #[clap(name = "version")]
    Version,

    /// Record, search, and sweep durable decisions
    #[clap(name = "memory", visible_alias = "m")]
    Memory(memory::MemoryCli),

    /// Capture decisions from prompt text
    #[clap(name = "capture", visible_alias = "c")]
    Capture(capture::CaptureCli),

    /// Classify one line with the rule engine
    #[clap(name = "classify")]
    Classify {
        /// Line to classify.
        #[clap(long, value_name = "TEXT")]
        line: String,
    },

    /// Print the active decision context block
    #[clap(name = "context", visible_alias = "ctx")]
    Context,

    /// Print subsystem schemas
    #[clap(name = "schema")]
    Schema {
        /// Only this subsystem.
        #[clap(long)]
        subsystem: Option<String>,
    },
}

fn find_edict_project_root(start_dir: &Path) -> Result<PathBuf, EdictError> {
    let mut current_dir = PathBuf::from(start_dir);
    loop {
        if current_dir.join(".edict").exists() {
            return Ok(current_dir);
        }
        if !current_dir.pop() {
            return Err(EdictError::NotFound(
                "'.edict' directory not found in current or parent directories. Run `edict init` first.".to_string(),
            ));
        }
    }
}

fn init_project(dir: Option<PathBuf>, current_dir: &Path) -> Result<(), EdictError> {
    let target_dir = dir.unwrap_or_else(|| current_dir.to_path_buf());
    let target_dir = std::fs::canonicalize(&target_dir)?;
    let store = Store::new(target_dir);
    std::fs::create_dir_all(store.data_dir())?;
    println!("Initialized decision memory at {}", store.edict_dir().display());
    Ok(())
}

fn print_schemas(subsystem: Option<&str>) -> Result<(), EdictError> {
    let schemas =
        vec![memory::schema(), capture::schema(), classifier::schema(), context::schema()];
    let filtered: Vec<serde_json::Value> = match subsystem {
        Some(name) => schemas
            .into_iter()
            .filter(|schema| schema.get("name").and_then(|v| v.as_str()) == Some(name))
            .collect(),
        None => schemas,
    };
    if filtered.is_empty() {
        return Err(EdictError::NotFound(format!(
            "no subsystem named {}",
            subsystem.unwrap_or_default()
        )));
    }
    println!("{}", serde_json::to_string_pretty(&filtered).unwrap());
    Ok(())
}

pub fn run() -> Result<(), EdictError> {
    let cli = Cli::parse();
    let current_dir = std::env::current_dir()?;

    match cli.command {
        Command::Version => {
            // Simple output for scripts/parsing
            println!("v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Init { dir } => init_project(dir, &current_dir),
        Command::Schema { subsystem } => print_schemas(subsystem.as_deref()),
        Command::Classify { line } => {
            let classification = classifier::classify(&line);
            println!("{}", serde_json::to_string_pretty(&classification).unwrap());
            Ok(())
        }
        command => {
            // Project commands need an initialized `.edict` directory.
            let project_root = find_edict_project_root(&current_dir)?;
            let store = Store::new(project_root);
            std::fs::create_dir_all(store.data_dir())?;

            match command {
                Command::Memory(memory_cli) => memory::run_memory_cli(&store, memory_cli),
                Command::Capture(capture_cli) => capture::run_capture_cli(&store, capture_cli),
                Command::Context => context::run_context_cli(&store),
                _ => unreachable!(),
            }
        }
    }
}
