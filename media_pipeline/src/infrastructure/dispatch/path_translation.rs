// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! §4.5/§6's ordered `(serverPrefix, remotePrefix)` map, consulted at every
//! `job:assign` boundary. The table must already be sorted
//! longest-`serverPrefix`-first (`AppConfig::path_translation_table` does
//! this); translation here is a first-match scan, never a re-sort.

use media_pipeline_domain::PipelineError;

pub struct PathTranslator {
    table: Vec<(String, String)>,
}

impl PathTranslator {
    pub fn new(table: Vec<(String, String)>) -> Self {
        Self { table }
    }

    /// Server-local absolute path → the path the remote encoder sees.
    pub fn to_remote(&self, server_path: &str) -> Result<String, PipelineError> {
        for (server_prefix, remote_prefix) in &self.table {
            if let Some(rest) = server_path.strip_prefix(server_prefix.as_str()) {
                return Ok(format!("{remote_prefix}{rest}"));
            }
        }
        Err(PipelineError::PathTranslationError(format!("no prefix mapping covers '{server_path}'")))
    }

    /// The inverse direction, used when a worker reports a path back (not
    /// currently exercised by the wire protocol, but kept symmetric with
    /// `to_remote` since §4.5 describes translation as bidirectional).
    pub fn to_server(&self, remote_path: &str) -> Result<String, PipelineError> {
        for (server_prefix, remote_prefix) in &self.table {
            if let Some(rest) = remote_path.strip_prefix(remote_prefix.as_str()) {
                return Ok(format!("{server_prefix}{rest}"));
            }
        }
        Err(PipelineError::PathTranslationError(format!("no prefix mapping covers '{remote_path}'")))
    }
}
