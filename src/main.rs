//! draftq CLI entry point
//!
//! Parses arguments and delegates to the CLI module. Errors are printed to
//! stderr and end the process with a non-zero exit code.

use draftq::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
