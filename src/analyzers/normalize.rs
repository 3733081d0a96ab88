use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::trace;

use crate::analyzers::types::NormalizedEvent;
use crate::reading::RawReading;

const FULL_FORMAT: &str = "%Y-%m-%d %H:%M";
const TIME_ONLY_FORMAT: &str = "%H:%M";

/// Parses `YYYY-MM-DD HH:MM`, or `HH:MM` placed on `day`.
pub fn parse_timestamp(raw: &str, day: NaiveDate) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, FULL_FORMAT)
        .ok()
        .or_else(|| {
            NaiveTime::parse_from_str(raw, TIME_ONLY_FORMAT)
                .ok()
                .map(|time| day.and_time(time))
        })
}

/// Turns one reading into an event for `day`.
///
/// Returns `None` when the reading has no usable site name or timestamp.
pub fn normalize(reading: &RawReading, day: NaiveDate) -> Option<NormalizedEvent> {
    let Some(site_id) = reading.name() else {
        trace!("Reading without a site name discarded");
        return None;
    };
    let Some(timestamp) = reading.time().and_then(|t| parse_timestamp(t, day)) else {
        trace!(site = site_id, time = ?reading.time(), "Reading with unparseable time discarded");
        return None;
    };

    Some(NormalizedEvent {
        site_id: site_id.to_string(),
        timestamp,
        occupancy: reading.occupancy(),
        attributes: reading.clone(),
    })
}

/// Normalizes every reading of a day, dropping the unusable ones.
pub fn normalize_day(readings: &[RawReading], day: NaiveDate) -> Vec<NormalizedEvent> {
    readings.iter().filter_map(|r| normalize(r, day)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::{FIELD_NAME, FIELD_NUM, FIELD_TIME};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 7).unwrap()
    }

    fn reading(time: &str, num: u64) -> RawReading {
        RawReading::new()
            .with_field(FIELD_NAME, "上海豫园")
            .with_field(FIELD_TIME, time)
            .with_field(FIELD_NUM, num)
    }

    #[test]
    fn test_full_timestamp_keeps_its_own_date() {
        let event = normalize(&reading("2025-11-06 16:53", 12), day()).unwrap();
        assert_eq!(
            event.timestamp,
            NaiveDate::from_ymd_opt(2025, 11, 6)
                .unwrap()
                .and_hms_opt(16, 53, 0)
                .unwrap()
        );
        assert_eq!(event.occupancy, 12);
        assert_eq!(event.site_id, "上海豫园");
    }

    #[test]
    fn test_time_only_uses_processing_day() {
        let event = normalize(&reading("14:10", 3), day()).unwrap();
        assert_eq!(event.timestamp, day().and_hms_opt(14, 10, 0).unwrap());
    }

    #[test]
    fn test_unparseable_time_is_discarded() {
        assert!(normalize(&reading("yesterday", 1), day()).is_none());
        assert!(normalize(&reading("2025/11/07 10:00", 1), day()).is_none());
        assert!(normalize(&reading("", 1), day()).is_none());
    }

    #[test]
    fn test_missing_name_is_discarded() {
        let reading = RawReading::new().with_field(FIELD_TIME, "10:00");
        assert!(normalize(&reading, day()).is_none());
    }

    #[test]
    fn test_bad_occupancy_normalizes_to_zero() {
        let reading = reading("10:00", 0).with_field(FIELD_NUM, "closed");
        assert_eq!(normalize(&reading, day()).unwrap().occupancy, 0);
    }

    #[test]
    fn test_normalize_day_filters() {
        let readings = vec![
            reading("10:00", 1),
            reading("garbage", 2),
            reading("11:00", 3),
        ];
        let events = normalize_day(&readings, day());
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].occupancy, 3);
    }
}
