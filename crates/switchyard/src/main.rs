// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Switchyard - cost-aware routing for LLM requests.
//!
//! This is the binary entry point: it loads configuration, installs the
//! tracing subscriber, and dispatches the operator commands.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod analyze;
mod plan;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use switchyard_config::ConfigError;
use switchyard_config::model::SwitchyardConfig;

/// Switchyard - cost-aware routing for LLM requests.
#[derive(Parser, Debug)]
#[command(name = "switchyard", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify a request and show how it would be routed.
    Analyze {
        /// Request text.
        text: String,
        /// Attach the contents of this file as the request document.
        #[arg(long, value_name = "FILE")]
        document: Option<PathBuf>,
    },
    /// Show the ranked fallback chain for a tier.
    Plan {
        /// simple, moderate, or complex.
        tier: String,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Manage Switchyard configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Validate the configuration and report every problem found.
    Check,
}

fn load_config(path: Option<&Path>) -> Result<SwitchyardConfig, Vec<ConfigError>> {
    match path {
        Some(path) => switchyard_config::load_and_validate_path(path),
        None => switchyard_config::load_and_validate(),
    }
}

/// Initialize the tracing subscriber. `RUST_LOG` overrides `log_level`.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("switchyard={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            switchyard_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.service.log_level);
    switchyard_metrics::register_metrics();
    tracing::debug!(
        models = config.models.len(),
        cache = ?config.cache.backend,
        "configuration loaded"
    );

    let result = match cli.command {
        Some(Commands::Analyze { text, document }) => {
            analyze::run_analyze(&config, &text, document.as_deref()).await
        }
        Some(Commands::Plan { tier, json }) => plan::run_plan(&config, &tier, json),
        Some(Commands::Config {
            action: ConfigCommands::Check,
        }) => {
            println!(
                "switchyard: config ok (service.name={}, {} models)",
                config.service.name,
                config.models.len()
            );
            Ok(())
        }
        None => {
            println!("switchyard: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
