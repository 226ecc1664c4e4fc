// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gatecheck - multi-tenant container harvest orchestration.
//!
//! This is the binary entry point for the Gatecheck service.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::{Parser, Subcommand};

mod serve;

/// Gatecheck - multi-tenant container harvest orchestration.
#[derive(Parser, Debug)]
#[command(name = "gatecheck", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Gatecheck service.
    Serve {
        /// Config file path; defaults to the XDG hierarchy.
        #[arg(long)]
        config: Option<std::path::PathBuf>,
    },
    /// Print the effective configuration and exit.
    Config {
        /// Config file path; defaults to the XDG hierarchy.
        #[arg(long)]
        config: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { config } => serve::run_serve(config).await,
        Commands::Config { config } => serve::print_config(config),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
