//! Scriptlens CLI
//!
//! Prints the Steps, Actions or Raw view of a workflow script.

use std::process::ExitCode;

use scriptlens_core::cli;

fn main() -> ExitCode {
    match cli::run_cli() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
