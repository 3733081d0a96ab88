use std::collections::HashMap;

use crate::reading::RawReading;

/// Collapses readings sharing a `TIME` value and orders them chronologically.
///
/// The last occurrence of a timestamp wins. Readings without a `TIME` are
/// dropped. Timestamps are fixed-width and zero-padded, so sorting the raw
/// strings sorts by time.
pub fn dedup_history(readings: impl IntoIterator<Item = RawReading>) -> Vec<RawReading> {
    let mut by_time: HashMap<String, RawReading> = HashMap::new();

    for reading in readings {
        if let Some(time) = reading.time() {
            by_time.insert(time.to_string(), reading);
        }
    }

    let mut unique: Vec<(String, RawReading)> = by_time.into_iter().collect();
    unique.sort_by(|a, b| a.0.cmp(&b.0));
    unique.into_iter().map(|(_, reading)| reading).collect()
}
