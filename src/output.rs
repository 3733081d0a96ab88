//! JSON-lines encoding of stored records.
//!
//! Day files hold [`DayRecord`] lines, site files hold [`SiteRecord`] lines.
//! Decoding skips lines that are blank or malformed.

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::parser::Snapshot;
use crate::reading::RawReading;

/// One crawler run, appended to the day file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayRecord {
    pub timestamp: String,
    pub data: Snapshot,
}

/// One site's reading from a crawler run, appended to the site's month file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteRecord {
    pub timestamp: String,
    pub spot: RawReading,
}

/// Serializes records as newline-terminated JSON lines.
pub fn encode_lines<T: Serialize>(records: &[T]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for record in records {
        serde_json::to_writer(&mut out, record)?;
        out.push(b'\n');
    }
    Ok(out)
}

/// Parses each non-blank line, dropping the ones that do not decode.
pub fn decode_lines<T: DeserializeOwned>(bytes: &[u8]) -> Vec<T> {
    let text = String::from_utf8_lossy(bytes);
    let mut skipped = 0usize;

    let records: Vec<T> = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(i, line)| match serde_json::from_str(line) {
            Ok(record) => Some(record),
            Err(e) => {
                skipped += 1;
                debug!(line = i + 1, error = %e, "Skipping malformed JSON line");
                None
            }
        })
        .collect();

    if skipped > 0 {
        warn!(skipped, kept = records.len(), "Malformed JSON lines skipped");
    }
    records
}

/// Every site row of every snapshot in a day file, in file order.
pub fn rows_from_day_file(bytes: &[u8]) -> Vec<RawReading> {
    decode_lines::<DayRecord>(bytes)
        .into_iter()
        .flat_map(|record| record.data.rows)
        .collect()
}

/// Every reading in a site file, in file order.
pub fn spots_from_site_file(bytes: &[u8]) -> Vec<RawReading> {
    decode_lines::<SiteRecord>(bytes)
        .into_iter()
        .map(|record| record.spot)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::{FIELD_NAME, FIELD_TIME};

    fn spot(name: &str, time: &str) -> RawReading {
        RawReading::new()
            .with_field(FIELD_NAME, name)
            .with_field(FIELD_TIME, time)
    }

    #[test]
    fn test_encode_one_line_per_record() {
        let records = vec![
            SiteRecord { timestamp: "t1".into(), spot: spot("A", "10:00") },
            SiteRecord { timestamp: "t2".into(), spot: spot("A", "10:30") },
        ];
        let bytes = encode_lines(&records).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_day_file_rows_are_flattened() {
        let day = [
            DayRecord {
                timestamp: "t1".into(),
                data: Snapshot {
                    rows: vec![spot("A", "09:00"), spot("B", "09:00")],
                    ..Default::default()
                },
            },
            DayRecord {
                timestamp: "t2".into(),
                data: Snapshot {
                    rows: vec![spot("A", "09:30")],
                    ..Default::default()
                },
            },
        ];
        let bytes = encode_lines(&day).unwrap();
        let rows = rows_from_day_file(&bytes);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].time(), Some("09:30"));
    }

    #[test]
    fn test_malformed_and_blank_lines_are_skipped() {
        let record = |timestamp: &str, time: &str| SiteRecord {
            timestamp: timestamp.into(),
            spot: spot("A", time),
        };
        let mut bytes = encode_lines(&[record("t", "10:00")]).unwrap();
        bytes.extend_from_slice(b"\n{not json\n   \n");
        bytes.extend_from_slice(&encode_lines(&[record("u", "11:00")]).unwrap());

        let spots = spots_from_site_file(&bytes);
        assert_eq!(spots.len(), 2);
        assert_eq!(spots[1].time(), Some("11:00"));
    }

    #[test]
    fn test_empty_file() {
        assert!(rows_from_day_file(b"").is_empty());
    }
}
