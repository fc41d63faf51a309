// cifdb - mmCIF to document store loader
// Copyright (c) 2025 cifdb Contributors
// Licensed under the MIT License

use cifdb::cli::commands::EXIT_FATAL;
use cifdb::cli::{Cli, Commands};
use cifdb::config::{load_config, LoggingConfig};
use cifdb::log_error_with_context;
use cifdb::logging::init_logging;
use clap::Parser;
use std::process;

#[tokio::main]
async fn main() {
    // Optional; a missing .env is ignored
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Logging follows the configuration file when it loads; commands report
    // configuration errors themselves
    let (config_level, logging_config) = match (&cli.command, load_config(&cli.config)) {
        (Commands::Init(_), _) | (_, Err(_)) => ("info".to_string(), console_only()),
        (_, Ok(config)) => (config.application.log_level, config.logging),
    };
    let log_level = cli.log_level.clone().unwrap_or(config_level);

    let guard = match init_logging(&log_level, &logging_config).or_else(|e| {
        eprintln!("⚠️  File logging disabled: {e}");
        init_logging(&log_level, &console_only())
    }) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(EXIT_FATAL);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "cifdb - mmCIF to document store loader"
    );

    let exit_code = match execute_command(&cli).await {
        Ok(code) => code,
        Err(e) => {
            log_error_with_context!(&e, "Command execution failed");
            eprintln!("Error: {e}");
            EXIT_FATAL
        }
    };

    // process::exit skips destructors; flush file logs first
    drop(guard);
    process::exit(exit_code);
}

fn console_only() -> LoggingConfig {
    LoggingConfig {
        local_enabled: false,
        ..LoggingConfig::default()
    }
}

async fn execute_command(cli: &Cli) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Load(args) => args.execute(&cli.config).await,
        Commands::Fetch(args) => args.execute(&cli.config).await,
        Commands::ValidateConfig(args) => args.execute(&cli.config).await,
        Commands::Init(args) => args.execute().await,
    }
}
