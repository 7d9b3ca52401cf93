// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! floor - office configuration tooling

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{check, teams};
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "floor", version, about = "Inspect and validate office configurations")]
struct Cli {
    /// Output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an office configuration file
    Check(check::CheckArgs),
    /// List built-in team sources and their properties
    Teams,
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Check(args) => check::check(args, cli.format),
        Commands::Teams => {
            teams::teams(cli.format);
            Ok(())
        }
    }
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
