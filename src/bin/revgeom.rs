//! revgeom CLI Binary
//!
//! Command-line interface for revision geometry regeneration.

use clap::Parser;
use revgeom::cli::{Cli, RunContext};
use revgeom::config::ConfigLoader;
use revgeom::logging::{init_logging, LoggingConfig};
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    let logging_config = build_logging_config(&cli);
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("revgeom CLI starting");

    let context = match RunContext::new(cli.workspace.clone(), cli.config.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Error initializing workspace: {}", e);
            eprintln!("{}", revgeom::cli::map_error(&e));
            process::exit(1);
        }
    };

    match context.execute(&cli.command) {
        Ok(output) => {
            println!("{}", output.text);
            if output.failed {
                error!("Command reported a failure");
                process::exit(1);
            }
            info!("Command completed successfully");
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", revgeom::cli::map_error(&e));
            process::exit(1);
        }
    }
}

/// Logging config: the `[logging]` table overridden by CLI flags, off unless asked for
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    if !cli.verbose && cli.log_level.is_none() {
        return LoggingConfig::silent();
    }

    let mut config = ConfigLoader::load_with_override(&cli.workspace, cli.config.as_deref())
        .map(|c| c.logging)
        .unwrap_or_default();

    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.format = format;
    }
    if let Some(output) = cli.log_output {
        config.output = output;
    }
    if let Some(ref file) = cli.log_file {
        config.file = file.clone();
    }
    config.resolve_file(&cli.workspace);

    config
}
