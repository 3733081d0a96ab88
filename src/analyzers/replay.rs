use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::trace;

use crate::analyzers::grid::TimeGrid;
use crate::analyzers::types::{DayReplay, DaySite, NormalizedEvent};

/// Replays one day's events across the grid.
///
/// Events are stable-sorted by timestamp, then merged with the grid in a
/// single pass: at each grid point every event at or before it is applied,
/// after which the sum of the last known occupancy of each site is recorded.
/// Events later than the last grid point are never applied. Trend values
/// saturate at `u64::MAX`.
pub fn replay_day(
    mut events: Vec<NormalizedEvent>,
    day: NaiveDate,
    grid: &TimeGrid,
) -> DayReplay {
    events.sort_by_key(|e| e.timestamp);

    let mut sites: Vec<DaySite> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut trend = Vec::with_capacity(grid.len());
    // Wide enough that summing any number of u64 readings cannot overflow.
    let mut total: u128 = 0;

    let mut pending = events.into_iter().peekable();

    for point in grid.points() {
        let boundary = day.and_time(*point);

        while let Some(event) = pending.next_if(|e| e.timestamp <= boundary) {
            match index.get(&event.site_id) {
                Some(&i) => {
                    let site = &mut sites[i];
                    total = total - u128::from(site.current) + u128::from(event.occupancy);
                    site.current = event.occupancy;
                    site.peak = site.peak.max(event.occupancy);
                    site.latest = event.attributes;
                }
                None => {
                    total += u128::from(event.occupancy);
                    index.insert(event.site_id.clone(), sites.len());
                    sites.push(DaySite {
                        site_id: event.site_id,
                        current: event.occupancy,
                        peak: event.occupancy,
                        latest: event.attributes,
                    });
                }
            }
        }

        trend.push(u64::try_from(total).unwrap_or(u64::MAX));
    }

    let after_close = pending.count();
    if after_close > 0 {
        trace!(day = %day, after_close, "Events after the last grid point ignored");
    }

    DayReplay { day, trend, sites }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::RawReading;
    use chrono::NaiveTime;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 7).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn event(site: &str, h: u32, m: u32, occupancy: u64) -> NormalizedEvent {
        NormalizedEvent {
            site_id: site.to_string(),
            timestamp: day().and_time(t(h, m)),
            occupancy,
            attributes: RawReading::new().with_field("NUM", occupancy),
        }
    }

    fn small_grid() -> TimeGrid {
        TimeGrid::new(t(9, 0), t(10, 0), 30).unwrap()
    }

    #[test]
    fn test_carries_last_reading_forward() {
        let events = vec![event("A", 9, 45, 300), event("A", 9, 5, 100)];
        let replay = replay_day(events, day(), &small_grid());

        assert_eq!(replay.trend, vec![0, 100, 300]);
        assert_eq!(replay.peak("A"), Some(300));
    }

    #[test]
    fn test_event_on_boundary_is_included() {
        let events = vec![event("A", 9, 30, 40)];
        let replay = replay_day(events, day(), &small_grid());
        assert_eq!(replay.trend, vec![0, 40, 40]);
    }

    #[test]
    fn test_sums_across_sites() {
        let events = vec![
            event("A", 8, 50, 10),
            event("B", 9, 10, 5),
            event("A", 9, 20, 20),
            event("B", 10, 0, 1),
        ];
        let replay = replay_day(events, day(), &small_grid());
        assert_eq!(replay.trend, vec![10, 25, 21]);
        assert_eq!(replay.peak("A"), Some(20));
        assert_eq!(replay.peak("B"), Some(5));
    }

    #[test]
    fn test_peak_survives_later_drop() {
        let events = vec![event("A", 9, 0, 80), event("A", 9, 15, 10)];
        let replay = replay_day(events, day(), &small_grid());
        assert_eq!(replay.peak("A"), Some(80));
        assert_eq!(replay.sites[0].current, 10);
    }

    #[test]
    fn test_events_after_close_are_dropped() {
        let events = vec![
            event("A", 9, 0, 5),
            event("B", 10, 1, 999),
            event("A", 11, 0, 500),
        ];
        let replay = replay_day(events, day(), &small_grid());

        assert_eq!(replay.trend, vec![5, 5, 5]);
        assert_eq!(replay.peak("A"), Some(5));
        assert_eq!(replay.peak("B"), None);
    }

    #[test]
    fn test_huge_occupancy_saturates_instead_of_overflowing() {
        let events = vec![
            event("A", 9, 0, u64::MAX),
            event("B", 9, 0, 5),
            event("A", 9, 20, 10),
        ];
        let replay = replay_day(events, day(), &small_grid());

        assert_eq!(replay.trend, vec![u64::MAX, 15, 15]);
        assert_eq!(replay.peak("A"), Some(u64::MAX));
    }

    #[test]
    fn test_empty_day_is_all_zero() {
        let grid = small_grid();
        let replay = replay_day(Vec::new(), day(), &grid);
        assert_eq!(replay.trend, vec![0; grid.len()]);
        assert!(replay.sites.is_empty());
    }

    #[test]
    fn test_ties_keep_input_order() {
        let mut first = event("A", 9, 10, 7);
        first.attributes = RawReading::new().with_field("marker", "first");
        let mut second = event("A", 9, 10, 3);
        second.attributes = RawReading::new().with_field("marker", "second");

        let replay = replay_day(vec![first, second], day(), &small_grid());
        assert_eq!(replay.trend, vec![0, 3, 3]);
        assert_eq!(replay.peak("A"), Some(7));
        assert_eq!(replay.sites[0].latest.get("marker").unwrap(), "second");
    }

    #[test]
    fn test_replay_is_deterministic() {
        let events = vec![
            event("C", 9, 50, 2),
            event("A", 9, 5, 1),
            event("B", 9, 5, 4),
            event("A", 9, 25, 9),
        ];
        let first = replay_day(events.clone(), day(), &small_grid());
        let second = replay_day(events, day(), &small_grid());
        assert_eq!(first, second);
    }

    #[test]
    fn test_sites_in_first_applied_order() {
        let events = vec![event("late", 9, 40, 1), event("early", 9, 1, 1)];
        let replay = replay_day(events, day(), &small_grid());
        let order: Vec<_> = replay.sites.iter().map(|s| s.site_id.as_str()).collect();
        assert_eq!(order, vec!["early", "late"]);
    }
}
