//! CLI module for draftq
//!
//! Provides command-line interface for:
//! - init: Write a default configuration file
//! - serve: Boot and serve the HTTP API
//! - query: One-shot list or fetch over stdin/stdout

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{execute_query, init, query, run, run_command, serve, QueryRequest};
pub use config::{Config, PermissionMode};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_request, write_response};
