// src/cli.rs

use clap::{Args, Parser, Subcommand};
use scorton::config::{self, ComplianceMode};
use scorton::core::models::Tool;
use serde_json::Value;

#[derive(Parser)]
#[command(
    name = "scorton",
    version,
    about = "Security scanning, scoring and compliance reports"
)]
pub struct Cli {
    /// Show debug logs on stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Per-invocation overrides for the legacy backend. Never persisted.
#[derive(Args, Debug, Clone, Default)]
pub struct BackendArgs {
    /// Base URL of the Scorton API
    #[arg(long)]
    pub api: Option<String>,

    /// Bearer token for the Scorton API
    #[arg(long)]
    pub token: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a single security scan tool against a target
    Scan {
        /// Tool to run
        #[arg(value_enum)]
        tool: Tool,

        /// Domain, host or URL to scan
        target: String,

        #[command(flatten)]
        backend: BackendArgs,
    },

    /// Compute the cyber score of a target
    Score {
        target: String,

        #[command(flatten)]
        backend: BackendArgs,
    },

    /// Run a full audit and write a Markdown report
    Audit {
        target: String,

        #[command(flatten)]
        backend: BackendArgs,
    },

    /// Assess DORA and/or NIS2 compliance
    Compliance {
        /// Framework to assess
        #[arg(value_enum)]
        framework: ComplianceMode,

        target: String,

        #[command(flatten)]
        backend: BackendArgs,
    },

    /// Show the resolved settings, or persist one key into the project file
    Config {
        /// Persist KEY=VALUE into ./.scorton/config.json
        #[arg(long, value_name = "KEY=VALUE", value_parser = parse_set)]
        set: Option<(String, Value)>,
    },

    /// Write a starter ./.scorton/config.json
    Init {
        /// Template tag stored in the project file
        #[arg(long, default_value = "basic")]
        template: String,
    },

    /// List scan tools and the backend that serves each
    Tools,
}

fn parse_set(input: &str) -> Result<(String, Value), String> {
    config::parse_assignment(input).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn unknown_framework_is_rejected() {
        assert!(Cli::try_parse_from(["scorton", "compliance", "sox", "example.com"]).is_err());
    }

    #[test]
    fn scan_flags_are_parsed() {
        let cli = Cli::try_parse_from(["scorton", "scan", "ssl_scan", "example.com", "--api", "http://x"]).unwrap();
        match cli.command {
            Commands::Scan { tool, target, backend } => {
                assert_eq!(tool, Tool::SslScan);
                assert_eq!(target, "example.com");
                assert_eq!(backend.api.as_deref(), Some("http://x"));
            }
            _ => panic!("expected scan"),
        }
    }
}
