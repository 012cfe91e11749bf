// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Raw clap CLI definition, pre-validation.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "media-pipeline", version, about = "Media ingestion control plane")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enables debug-level tracing output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a `config.toml` layered over built-in defaults and env vars.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Overrides the number of step-execution worker threads.
    #[arg(long, global = true)]
    pub cpu_threads: Option<usize>,

    /// Overrides the number of I/O (repository/transport) worker threads.
    #[arg(long, global = true)]
    pub io_threads: Option<usize>,

    /// Bounded channel depth for internal event buses.
    #[arg(long, global = true, default_value_t = 256)]
    pub channel_depth: usize,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Starts the control-plane service.
    Serve {
        /// Address the encoder dispatch WebSocket server binds to.
        #[arg(long, default_value = "0.0.0.0:7878")]
        bind: String,

        /// Repository connection string, e.g. `sqlite://./media-pipeline.db`.
        #[arg(long, default_value = "sqlite://media-pipeline.db")]
        database_url: String,
    },
    /// Applies pending schema migrations and exits.
    Migrate {
        #[arg(long, default_value = "sqlite://media-pipeline.db")]
        database_url: String,
    },
}

/// Parses `std::env::args()` with clap, exiting the process on `--help`/
/// `--version` or a malformed invocation (clap's own behavior).
pub fn parse_cli() -> Cli {
    Cli::parse()
}
