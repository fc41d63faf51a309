//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for cifdb using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// cifdb - load mmCIF data into a document store
#[derive(Parser, Debug)]
#[command(name = "cifdb")]
#[command(version, about, long_about = None)]
#[command(author = "cifdb Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "cifdb.toml", env = "CIFDB_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "CIFDB_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build documents from source files and load them into the store
    Load(commands::load::LoadArgs),

    /// Build documents and write them as JSON without loading
    Fetch(commands::fetch::FetchArgs),

    /// Validate configuration file and schema catalog
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_load() {
        let cli = Cli::parse_from(["cifdb", "load"]);
        assert_eq!(cli.config, "cifdb.toml");
        assert!(matches!(cli.command, Commands::Load(_)));
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["cifdb", "--config", "custom.toml", "load"]);
        assert_eq!(cli.config, "custom.toml");
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["cifdb", "-l", "debug", "fetch"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
        assert!(matches!(cli.command, Commands::Fetch(_)));
    }

    #[test]
    fn test_cli_parse_load_overrides() {
        let cli = Cli::parse_from([
            "cifdb",
            "load",
            "--mode",
            "replace",
            "--collection",
            "pdbx_core_entity",
            "--slice",
            "ENTITY",
            "--document-limit",
            "10",
            "--dry-run",
        ]);
        let Commands::Load(args) = cli.command else {
            panic!("expected load command");
        };
        assert_eq!(args.mode.as_deref(), Some("replace"));
        assert_eq!(args.collection.as_deref(), Some("pdbx_core_entity"));
        assert_eq!(args.slice.as_deref(), Some("ENTITY"));
        assert_eq!(args.document_limit, Some(10));
        assert!(args.dry_run);
    }

    #[test]
    fn test_cli_parse_validate_config() {
        let cli = Cli::parse_from(["cifdb", "validate-config"]);
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["cifdb", "init"]);
        assert!(matches!(cli.command, Commands::Init(_)));
    }
}
