//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Project setup | `init` |
//! | Validation | Schema and reference checks | `validate`, `check` |
//! | Assembly | Build and partition roadmaps | `merge`, `split` |
//! | Store | Persist partitioned roadmaps | `store save`, `store load`, `store list` |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! The default can be changed with `default_format` in the global config.
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output on stderr:
//! ```bash
//! roadmap --verbose check skeleton.json --tasks p1.json
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod merge_cmd;
mod output;
mod store_cmd;
mod validate;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
