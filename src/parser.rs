//! JSON parser for snapshot API responses.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::reading::{RawReading, lenient_u64};

/// Status code the API reports in the body on success.
pub const API_OK: i64 = 200;

/// One response of the snapshot API: every site's latest reading.
///
/// Unknown top-level fields are kept so stored snapshots stay faithful.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub total: Value,
    #[serde(default)]
    pub rows: Vec<RawReading>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    /// When the crawler received the snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_time: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Snapshot {
    /// Site count as reported by the API, which sends it as a string.
    pub fn reported_total(&self) -> u64 {
        lenient_u64(&self.total).unwrap_or(self.rows.len() as u64)
    }

    pub fn is_ok(&self) -> bool {
        self.code == Some(API_OK)
    }
}

/// Decodes a snapshot from a response body.
///
/// # Errors
///
/// Returns an error if the bytes are not a JSON object of the expected shape.
pub fn parse_snapshot(bytes: &[u8]) -> Result<Snapshot> {
    Ok(serde_json::from_slice(bytes)?)
}
