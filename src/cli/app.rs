//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use super::output::{Output, OutputFormat};
use super::{merge_cmd, store_cmd, validate};
use crate::schema::SchemaKind;
use crate::storage::{Config, Project};

#[derive(Parser)]
#[command(name = "roadmap")]
#[command(author, version, about = "Validate, merge, and partition modular roadmap documents")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config's default_format)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new roadmap project
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate one document against its schema
    Validate {
        /// JSON file to validate
        file: PathBuf,

        /// Schema to validate against (inferred from schema_metadata when omitted)
        #[arg(long, value_enum)]
        kind: Option<SchemaKind>,
    },

    /// Validate a skeleton with its task and detail fragments
    Check {
        /// Skeleton fragment
        skeleton: PathBuf,

        /// Phase tasks fragments
        #[arg(long = "tasks", num_args = 1..)]
        tasks: Vec<PathBuf>,

        /// Task details fragments
        #[arg(long = "details", num_args = 1..)]
        details: Vec<PathBuf>,
    },

    /// Validate and merge fragments into one roadmap
    Merge {
        /// Skeleton fragment
        skeleton: PathBuf,

        /// Phase tasks fragments
        #[arg(long = "tasks", num_args = 1..)]
        tasks: Vec<PathBuf>,

        /// Task details fragments
        #[arg(long = "details", num_args = 1..)]
        details: Vec<PathBuf>,

        /// Write the merged roadmap here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Split a roadmap into an outline and per-phase task files
    Split {
        /// Canonical roadmap document
        document: PathBuf,

        /// Directory to write outline.json and phase-<id>.json into
        #[arg(long)]
        out_dir: PathBuf,
    },

    /// Save, load, and list roadmaps in the project store
    #[command(subcommand)]
    Store(store_cmd::StoreCommands),
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let format = match cli.format {
        Some(format) => format,
        None => Config::load_global()?.default_format,
    };
    let output = Output::new(format, cli.verbose);

    output.verbose("Roadmap CLI starting");

    match cli.command {
        Commands::Init { path } => {
            output.verbose_ctx("init", &format!("Initializing project at: {}", path.display()));
            let project = Project::init(&path)?;
            output.verbose_ctx(
                "init",
                &format!("Created store at: {}", project.store_dir().display()),
            );
            output.success(&format!(
                "Initialized roadmap project at {}",
                project.root().display()
            ));
        }

        Commands::Validate { file, kind } => validate::validate(&output, &file, kind)?,

        Commands::Check {
            skeleton,
            tasks,
            details,
        } => validate::check(&output, &skeleton, &tasks, &details)?,

        Commands::Merge {
            skeleton,
            tasks,
            details,
            output: destination,
        } => merge_cmd::merge(&output, &skeleton, &tasks, &details, destination.as_deref())?,

        Commands::Split { document, out_dir } => merge_cmd::split(&output, &document, &out_dir)?,

        Commands::Store(cmd) => store_cmd::run(cmd, &output)?,
    }

    output.verbose("Command completed successfully");
    Ok(())
}
