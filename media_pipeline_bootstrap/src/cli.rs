// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface Module
//!
//! Bootstrap-layer CLI handling with security-first design.
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  1. parser::parse()                 │  Parse CLI with clap
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  2. validator::validate()           │  Security validation
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  3. ValidatedCli                    │  Safe, validated config
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `parser` - CLI structure and clap parsing
//! - `validator` - Security validation layer

pub mod parser;
pub mod validator;

pub use parser::{parse_cli, Cli, Commands};
pub use validator::{ParseError, SecureArgParser};

use std::path::PathBuf;

/// Validated CLI configuration.
///
/// All paths are canonicalized and all values are range-checked before the
/// rest of the process ever sees them.
#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub verbose: bool,
    pub config: Option<PathBuf>,
    pub cpu_threads: Option<usize>,
    pub io_threads: Option<usize>,
    pub channel_depth: usize,
}

/// Validated command variants.
#[derive(Debug, Clone)]
pub enum ValidatedCommand {
    /// Starts the control-plane service: the axum dispatch fabric, the
    /// scheduler's periodic tasks, and the executor's resumable pool.
    Serve { bind: String, database_url: String },
    /// Applies the repository schema to a (possibly fresh) database file
    /// without starting the service, for deployment tooling.
    Migrate { database_url: String },
}

/// Parses and validates CLI arguments in one step.
///
/// # Errors
///
/// Returns `ParseError` if any validation fails.
pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    let cli = parse_cli();
    validate_cli(cli)
}

fn validate_cli(cli: Cli) -> Result<ValidatedCli, ParseError> {
    let config = if let Some(ref path) = cli.config {
        SecureArgParser::validate_path(&path.to_string_lossy())?;
        Some(path.clone())
    } else {
        None
    };

    if cli.channel_depth == 0 {
        return Err(ParseError::InvalidValue {
            arg: "channel-depth".to_string(),
            reason: "must be greater than 0".to_string(),
        });
    }

    if let Some(threads) = cli.cpu_threads {
        if threads == 0 || threads > 128 {
            return Err(ParseError::InvalidValue {
                arg: "cpu-threads".to_string(),
                reason: "must be between 1 and 128".to_string(),
            });
        }
    }

    if let Some(threads) = cli.io_threads {
        if threads == 0 || threads > 256 {
            return Err(ParseError::InvalidValue {
                arg: "io-threads".to_string(),
                reason: "must be between 1 and 256".to_string(),
            });
        }
    }

    let command = match cli.command {
        Commands::Serve { bind, database_url } => {
            SecureArgParser::validate_argument(&bind)?;
            SecureArgParser::validate_argument(&database_url)?;
            ValidatedCommand::Serve { bind, database_url }
        }
        Commands::Migrate { database_url } => {
            SecureArgParser::validate_argument(&database_url)?;
            ValidatedCommand::Migrate { database_url }
        }
    };

    Ok(ValidatedCli {
        command,
        verbose: cli.verbose,
        config,
        cpu_threads: cli.cpu_threads,
        io_threads: cli.io_threads,
        channel_depth: cli.channel_depth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_cli(command: Commands) -> Cli {
        Cli { command, verbose: false, config: None, cpu_threads: None, io_threads: None, channel_depth: 256 }
    }

    #[test]
    fn zero_channel_depth_is_rejected() {
        let mut cli = base_cli(Commands::Serve { bind: "0.0.0.0:7878".into(), database_url: "sqlite://db.sqlite".into() });
        cli.channel_depth = 0;
        assert!(validate_cli(cli).is_err());
    }

    #[test]
    fn oversized_cpu_threads_is_rejected() {
        let mut cli = base_cli(Commands::Serve { bind: "0.0.0.0:7878".into(), database_url: "sqlite://db.sqlite".into() });
        cli.cpu_threads = Some(1000);
        assert!(validate_cli(cli).is_err());
    }

    #[test]
    fn well_formed_serve_command_validates() {
        let cli = base_cli(Commands::Serve { bind: "0.0.0.0:7878".into(), database_url: "sqlite://db.sqlite".into() });
        let validated = validate_cli(cli).unwrap();
        assert!(matches!(validated.command, ValidatedCommand::Serve { .. }));
    }
}
