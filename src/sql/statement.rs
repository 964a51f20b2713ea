//! Parameterized statements - SQL text plus its bound parameter values.
//!
//! Compilation never interpolates user values into SQL text. Every value
//! binds as a `ParamValue` whose position matches a `Token::Placeholder`
//! in the emitted SQL, so the driver receives text and values separately.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A value bound to a statement parameter.
///
/// Positional: `params[i]` corresponds to placeholder index `i`
/// (`$1` / `@p1` / the i-th `?`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl ParamValue {
    /// JSON representation used on the wire to the worker process.
    ///
    /// Dates and timestamps travel as ISO-8601 strings; the driver side
    /// converts them back using the declared column type.
    pub fn to_wire(&self) -> serde_json::Value {
        match self {
            ParamValue::Null => serde_json::Value::Null,
            ParamValue::Bool(b) => serde_json::Value::Bool(*b),
            ParamValue::Int(n) => serde_json::Value::from(*n),
            ParamValue::Float(f) => serde_json::Value::from(*f),
            ParamValue::String(s) => serde_json::Value::String(s.clone()),
            ParamValue::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
            ParamValue::DateTime(dt) => {
                serde_json::Value::String(dt.format("%Y-%m-%dT%H:%M:%S").to_string())
            }
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::String(s.into())
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        ParamValue::Int(n)
    }
}

impl From<f64> for ParamValue {
    fn from(f: f64) -> Self {
        ParamValue::Float(f)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

/// A compiled statement: SQL text for one dialect plus ordered parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// SQL text with dialect-appropriate placeholders.
    pub sql: String,
    /// Bound values, positionally matching the placeholders.
    pub params: Vec<ParamValue>,
}

impl Statement {
    pub fn new(sql: String, params: Vec<ParamValue>) -> Self {
        Self { sql, params }
    }

    /// Wire form of the parameter list.
    pub fn wire_params(&self) -> Vec<serde_json::Value> {
        self.params.iter().map(ParamValue::to_wire).collect()
    }
}
