//! CLI argument definitions using clap
//!
//! Commands:
//! - draftq init --config <path>
//! - draftq serve --config <path> [--port <port>]
//! - draftq query --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// draftq - query service for draft issues
#[derive(Parser, Debug)]
#[command(name = "draftq")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a default configuration file
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./draftq.json")]
        config: PathBuf,
    },

    /// Serve the HTTP API
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./draftq.json")]
        config: PathBuf,

        /// Overrides the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Execute a single list or fetch request read from stdin and exit
    Query {
        /// Path to configuration file
        #[arg(long, default_value = "./draftq.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_port_override() {
        let cli = Cli::try_parse_from(["draftq", "serve", "--config", "x.json", "--port", "9000"])
            .unwrap();
        match cli.command {
            Command::Serve { config, port } => {
                assert_eq!(config, PathBuf::from("x.json"));
                assert_eq!(port, Some(9000));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_default_config_path() {
        let cli = Cli::try_parse_from(["draftq", "query"]).unwrap();
        assert!(matches!(cli.command, Command::Query { config } if config == PathBuf::from("./draftq.json")));
    }
}
