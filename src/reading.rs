//! Raw site readings as published by the snapshot API.
//!
//! A reading is kept as the JSON object received so every field the API
//! sends survives into the outputs untouched. Typed accessors read the few
//! fields the aggregation needs, leniently.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const FIELD_NAME: &str = "NAME";
pub const FIELD_TIME: &str = "TIME";
pub const FIELD_NUM: &str = "NUM";
pub const FIELD_MAX_NUM: &str = "MAX_NUM";
pub const FIELD_CROWDING: &str = "SSD";
pub const FIELD_STATUS: &str = "TYPE";
pub const FIELD_DISTRICT_NAME: &str = "DNAME";
pub const FIELD_CODE: &str = "CODE";

/// One timestamped occupancy observation for a site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawReading(Map<String, Value>);

impl RawReading {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field, returning the reading for chaining.
    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Site name, trimmed. `None` when absent or blank.
    pub fn name(&self) -> Option<&str> {
        self.str_field(FIELD_NAME)
    }

    pub fn time(&self) -> Option<&str> {
        self.str_field(FIELD_TIME)
    }

    /// Current occupancy. Missing, negative or non-numeric values read as 0.
    pub fn occupancy(&self) -> u64 {
        self.0.get(FIELD_NUM).and_then(lenient_u64).unwrap_or(0)
    }

    pub fn capacity(&self) -> Option<u64> {
        self.0.get(FIELD_MAX_NUM).and_then(lenient_u64)
    }

    pub fn crowding(&self) -> Option<&str> {
        self.str_field(FIELD_CROWDING)
    }

    pub fn status(&self) -> Option<&str> {
        self.str_field(FIELD_STATUS)
    }

    pub fn district(&self) -> Option<&str> {
        self.str_field(FIELD_DISTRICT_NAME)
    }

    /// Site code. The API sends it as a string but numbers are accepted too.
    pub fn code(&self) -> Option<String> {
        match self.0.get(FIELD_CODE)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Reads a non-negative integer from a JSON number or numeric string.
/// Fractions truncate toward zero and values beyond `u64` saturate.
pub fn lenient_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(float_to_u64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(float_to_u64))
        }
        _ => None,
    }
}

// `as` saturates at the bounds of u64.
fn float_to_u64(f: f64) -> Option<u64> {
    (f.is_finite() && f >= 0.0).then_some(f as u64)
}
