// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `sqlx::Error` can't carry a blanket `From` impl into `PipelineError` —
//! neither type lives in this crate, so the orphan rule blocks it. Every
//! adapter maps explicitly through this helper instead, the same shape the
//! teacher's `save`/`find_by_id` methods use inline with
//! `.map_err(|e| PipelineError::database_error(...))`.

use media_pipeline_domain::PipelineError;

pub fn db_err(context: &str) -> impl Fn(sqlx::Error) -> PipelineError + '_ {
    move |e| PipelineError::database(format!("{context}: {e}"))
}

pub fn to_json(context: &str, value: &impl serde::Serialize) -> Result<String, PipelineError> {
    serde_json::to_string(value).map_err(|e| PipelineError::Serialization(format!("{context}: {e}")))
}

pub fn from_json<T: serde::de::DeserializeOwned>(context: &str, raw: &str) -> Result<T, PipelineError> {
    serde_json::from_str(raw).map_err(|e| PipelineError::Serialization(format!("{context}: {e}")))
}

/// Every status/state enum here derives `#[serde(rename_all = "snake_case")]`
/// with no variant data, so its JSON form is already the bare word we want
/// in a `TEXT` column — just without the quotes JSON wraps it in.
pub fn enum_to_text(value: &impl serde::Serialize) -> String {
    serde_json::to_string(value).expect("unit enum serialization is infallible").trim_matches('"').to_string()
}

pub fn text_to_enum<T: serde::de::DeserializeOwned>(context: &str, raw: &str) -> Result<T, PipelineError> {
    from_json(context, &format!("\"{raw}\""))
}
