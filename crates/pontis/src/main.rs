// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pontis - a multi-tenant bridge between social-messaging webhooks and a
//! conversational-AI runtime.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pontis_config::{load_config, load_config_from_path, PontisConfig};

mod serve;

/// Pontis - a social-messaging-to-AI bridge.
#[derive(Parser, Debug)]
#[command(name = "pontis", version, about, long_about = None)]
struct Cli {
    /// Path to a config file (defaults to the XDG hierarchy).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the bridge: HTTP surface plus background loops.
    Serve,
    /// Run one queue drain pass and print the report.
    Drain {
        /// Events to claim in this pass.
        #[arg(long)]
        batch_size: Option<u32>,
    },
    /// Run one credential refresh pass and print the outcomes.
    Refresh,
    /// Sweep expired sessions once.
    Cleanup,
    /// Load and validate the configuration.
    Config,
}

fn load(cli: &Cli) -> PontisConfig {
    let result = match &cli.config {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };
    match result {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: failed to load configuration: {e}");
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load(&cli);

    let result = match cli.command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Drain { batch_size } => serve::run_drain_once(config, batch_size).await,
        Commands::Refresh => serve::run_refresh_once(config).await,
        Commands::Cleanup => serve::run_cleanup_once(config).await,
        Commands::Config => serve::check_config(&config),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
