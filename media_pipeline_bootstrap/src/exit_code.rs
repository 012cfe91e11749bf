// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Unix Exit Codes
//!
//! Maps the process's top-level `anyhow::Error` to a `sysexits.h`-style
//! exit code, so a wrapping shell or supervisor can distinguish "bad CLI
//! input" from "can't reach the database" from "everything else".

use crate::cli::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    Usage = 64,
    DataErr = 65,
    NoInput = 66,
    Unavailable = 69,
    Software = 70,
    IoErr = 74,
    Config = 78,
}

impl ExitCode {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Inspects an error chain and picks the most specific exit code it can
/// find; falls back to `GeneralError` for anything unrecognised.
pub fn map_error_to_exit_code(err: &anyhow::Error) -> ExitCode {
    if let Some(parse_err) = err.downcast_ref::<ParseError>() {
        return match parse_err {
            ParseError::InvalidValue { .. } => ExitCode::Usage,
            ParseError::PathNotFound(_) => ExitCode::NoInput,
            ParseError::DisallowedCharacter(_) => ExitCode::DataErr,
            ParseError::CanonicalizationFailed { .. } => ExitCode::IoErr,
        };
    }
    if let Some(io_err) = err.downcast_ref::<std::io::Error>() {
        return match io_err.kind() {
            std::io::ErrorKind::NotFound => ExitCode::NoInput,
            _ => ExitCode::IoErr,
        };
    }
    if let Some(cfg_err) = err.downcast_ref::<config::ConfigError>() {
        let _ = cfg_err;
        return ExitCode::Config;
    }
    ExitCode::GeneralError
}

/// Converts an application result into a process exit code, logging the
/// error (if any) to stderr first.
pub fn result_to_exit_code<T>(result: anyhow::Result<T>) -> std::process::ExitCode {
    match result {
        Ok(_) => std::process::ExitCode::from(ExitCode::Success.code()),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::ExitCode::from(map_error_to_exit_code(&err).code())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_invalid_value_maps_to_usage() {
        let err = anyhow::Error::new(ParseError::InvalidValue { arg: "x".into(), reason: "bad".into() });
        assert_eq!(map_error_to_exit_code(&err), ExitCode::Usage);
    }

    #[test]
    fn unknown_error_maps_to_general_error() {
        let err = anyhow::anyhow!("something unexpected");
        assert_eq!(map_error_to_exit_code(&err), ExitCode::GeneralError);
    }

    #[test]
    fn success_is_zero() {
        let result: anyhow::Result<()> = Ok(());
        assert_eq!(result_to_exit_code(result), std::process::ExitCode::from(0));
    }
}
