// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Security validation for CLI-supplied strings and paths: rejects shell
//! metacharacters and null bytes before they reach a path, database URL, or
//! bind address, and canonicalizes paths that are expected to already exist.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid value for --{arg}: {reason}")]
    InvalidValue { arg: String, reason: String },

    #[error("path does not exist: {0}")]
    PathNotFound(String),

    #[error("argument contains a disallowed character: {0}")]
    DisallowedCharacter(String),

    #[error("failed to canonicalize path {path}: {reason}")]
    CanonicalizationFailed { path: String, reason: String },
}

/// Rejects control characters, null bytes, and shell metacharacters that
/// have no legitimate place in a path, URL, or bind address this process
/// consumes — a defense against argument-injection via a wrapping script
/// rather than against the direct CLI user.
const DISALLOWED: &[char] = &['\0', '\n', '\r', ';', '|', '&', '$', '`'];

pub struct SecureArgParser;

impl SecureArgParser {
    /// Validates a free-form argument string (names, URLs, bind addresses):
    /// no disallowed characters, no `..` path-traversal segments.
    pub fn validate_argument(value: &str) -> Result<(), ParseError> {
        if let Some(c) = value.chars().find(|c| DISALLOWED.contains(c)) {
            return Err(ParseError::DisallowedCharacter(format!("{c:?} in {value:?}")));
        }
        if value.split(['/', '\\']).any(|segment| segment == "..") {
            return Err(ParseError::DisallowedCharacter(format!("path traversal segment in {value:?}")));
        }
        Ok(())
    }

    /// Validates and canonicalizes a path that is expected to already exist
    /// on disk (a config file). Returns the canonical, absolute form.
    pub fn validate_path(value: &str) -> Result<PathBuf, ParseError> {
        Self::validate_argument(value)?;
        let path = Path::new(value);
        if !path.exists() {
            return Err(ParseError::PathNotFound(value.to_string()));
        }
        path.canonicalize()
            .map_err(|e| ParseError::CanonicalizationFailed { path: value.to_string(), reason: e.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_shell_metacharacters() {
        assert!(SecureArgParser::validate_argument("sqlite://db.sqlite; rm -rf /").is_err());
    }

    #[test]
    fn rejects_path_traversal() {
        assert!(SecureArgParser::validate_argument("../../etc/passwd").is_err());
    }

    #[test]
    fn accepts_a_plain_bind_address() {
        assert!(SecureArgParser::validate_argument("0.0.0.0:7878").is_ok());
    }

    #[test]
    fn missing_path_is_rejected() {
        assert!(matches!(SecureArgParser::validate_path("/no/such/file.toml"), Err(ParseError::PathNotFound(_))));
    }
}
