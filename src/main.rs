//! Roadmap CLI - validate, merge, and partition modular roadmap documents

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = roadmap_cli::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
