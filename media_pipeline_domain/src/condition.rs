// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Condition Evaluator (§4.2)
//!
//! Evaluates a step's `condition` descriptor against the blackboard
//! `Context`. Supports `== != > < >= <= in not_in contains matches` over
//! dotted paths, composed with logical `AND | OR`. An unknown operator
//! string (one a stored template carries from a newer build, or a typo in
//! config), or a dotted path that resolves to nothing, evaluates to `false`
//! rather than erroring — a condition is a gate, not a type check, and a
//! step whose condition is false is simply skipped (§4.2, §8 boundary
//! behaviours).

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    In,
    NotIn,
    Contains,
    Matches,
    /// Catches any operator string a stored template/config carries that
    /// this build doesn't recognise, so a predicate built against it still
    /// deserializes and simply evaluates to `false` rather than failing the
    /// whole template load.
    #[serde(other)]
    Unknown,
}

/// One leaf predicate: `path <op> value`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Predicate {
    pub path: String,
    pub operator: Operator,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Logic {
    And,
    Or,
}

/// A step condition: either a single predicate or a logical composition of
/// sub-conditions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    Predicate(Predicate),
    Compound { logic: Logic, conditions: Vec<Condition> },
}

/// Resolves a dotted path (`search.selectedRelease.resolution`) against a
/// JSON value. Missing segments resolve to `None`, never an error.
fn resolve_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut cur = root;
    for segment in path.split('.') {
        cur = cur.get(segment)?;
    }
    Some(cur)
}

fn numbers(a: &Value, b: &Value) -> Option<(f64, f64)> {
    Some((a.as_f64()?, b.as_f64()?))
}

fn eval_predicate(context: &Value, p: &Predicate) -> bool {
    let Some(actual) = resolve_path(context, &p.path) else {
        return false;
    };
    match p.operator {
        Operator::Eq => actual == &p.value,
        Operator::Ne => actual != &p.value,
        Operator::Gt => numbers(actual, &p.value).map(|(a, b)| a > b).unwrap_or(false),
        Operator::Lt => numbers(actual, &p.value).map(|(a, b)| a < b).unwrap_or(false),
        Operator::Ge => numbers(actual, &p.value).map(|(a, b)| a >= b).unwrap_or(false),
        Operator::Le => numbers(actual, &p.value).map(|(a, b)| a <= b).unwrap_or(false),
        Operator::In => p.value.as_array().map(|arr| arr.contains(actual)).unwrap_or(false),
        Operator::NotIn => p.value.as_array().map(|arr| !arr.contains(actual)).unwrap_or(false),
        Operator::Contains => match actual {
            Value::Array(arr) => arr.contains(&p.value),
            Value::String(s) => p.value.as_str().map(|needle| s.contains(needle)).unwrap_or(false),
            _ => false,
        },
        Operator::Matches => match (actual.as_str(), p.value.as_str()) {
            (Some(s), Some(pattern)) => Regex::new(pattern).map(|re| re.is_match(s)).unwrap_or(false),
            _ => false,
        },
        Operator::Unknown => false,
    }
}

pub fn evaluate(context: &Value, condition: &Condition) -> bool {
    match condition {
        Condition::Predicate(p) => eval_predicate(context, p),
        Condition::Compound { logic, conditions } => match logic {
            Logic::And => conditions.iter().all(|c| evaluate(context, c)),
            Logic::Or => conditions.iter().any(|c| evaluate(context, c)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> Value {
        json!({ "search": { "resolution": "1080p", "seeders": 42 } })
    }

    #[test]
    fn eq_and_gt_on_dotted_paths() {
        let c = Condition::Predicate(Predicate {
            path: "search.resolution".into(),
            operator: Operator::Eq,
            value: json!("1080p"),
        });
        assert!(evaluate(&ctx(), &c));

        let c = Condition::Predicate(Predicate { path: "search.seeders".into(), operator: Operator::Gt, value: json!(10) });
        assert!(evaluate(&ctx(), &c));
    }

    #[test]
    fn missing_path_is_false_not_error() {
        let c = Condition::Predicate(Predicate { path: "search.missing".into(), operator: Operator::Eq, value: json!(1) });
        assert!(!evaluate(&ctx(), &c));
    }

    #[test]
    fn unknown_operator_deserializes_and_evaluates_false() {
        let stored = json!({
            "kind": "predicate",
            "path": "search.resolution",
            "operator": "startswith",
            "value": "1080p",
        });
        let c: Condition = serde_json::from_value(stored).unwrap();
        assert!(!evaluate(&ctx(), &c));
    }

    #[test]
    fn compound_and_or() {
        let a = Condition::Predicate(Predicate { path: "search.resolution".into(), operator: Operator::Eq, value: json!("1080p") });
        let b = Condition::Predicate(Predicate { path: "search.seeders".into(), operator: Operator::Lt, value: json!(1) });
        let and = Condition::Compound { logic: Logic::And, conditions: vec![a.clone(), b.clone()] };
        let or = Condition::Compound { logic: Logic::Or, conditions: vec![a, b] };
        assert!(!evaluate(&ctx(), &and));
        assert!(evaluate(&ctx(), &or));
    }
}
