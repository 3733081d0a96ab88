//! Object-store key layout.
//!
//! Raw data lives under `tourist_data/YYYY/MM/`: one `DD.jsonl` per day with
//! full snapshots, and one `<site>.jsonl` per site and month.

use chrono::{Datelike, NaiveDate};

pub const DATA_PREFIX: &str = "tourist_data/";
pub const BACKUP_DIR: &str = "_backup/";
pub const UNKNOWN_SITE: &str = "未知景点";

const INVALID_FILENAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Replaces characters that are unsafe in object keys and file names.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if INVALID_FILENAME_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Calendar day used as a grouping key and as the path of a day file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DayKey {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl DayKey {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }

    pub fn object_key(&self) -> String {
        format!(
            "{DATA_PREFIX}{:04}/{:02}/{:02}.jsonl",
            self.year, self.month, self.day
        )
    }
}

/// One site's readings within one month.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SiteMonthKey {
    pub year: i32,
    pub month: u32,
    /// Sanitized site name.
    pub site: String,
}

impl SiteMonthKey {
    pub fn new(year: i32, month: u32, site_name: &str) -> Self {
        Self {
            year,
            month,
            site: sanitize_filename(site_name),
        }
    }

    pub fn from_date(date: NaiveDate, site_name: &str) -> Self {
        Self::new(date.year(), date.month(), site_name)
    }

    pub fn object_key(&self) -> String {
        format!(
            "{DATA_PREFIX}{:04}/{:02}/{}.jsonl",
            self.year, self.month, self.site
        )
    }
}

/// Every `(year, month)` touched by the inclusive range `from..=to`, oldest first.
pub fn months_covering(from: NaiveDate, to: NaiveDate) -> Vec<(i32, u32)> {
    let mut months = Vec::new();
    if to < from {
        return months;
    }

    let (mut year, mut month) = (from.year(), from.month());
    while (year, month) <= (to.year(), to.month()) {
        months.push((year, month));
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    months
}

/// Whether a key under `prefix` already follows the `YYYY/MM/<file>` layout.
pub fn is_current_layout(key: &str, prefix: &str) -> bool {
    let Some(rest) = key.strip_prefix(prefix) else {
        return false;
    };
    let parts: Vec<&str> = rest.split('/').collect();
    parts.len() == 3
        && [parts[0], parts[1]]
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("a/b\\c:d*e?f\"g<h>i|j"), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(sanitize_filename("  上海博物馆 "), "上海博物馆");
        assert_eq!(sanitize_filename("   "), "unknown");
    }

    #[test]
    fn test_day_key_path() {
        let key = DayKey::from_date(NaiveDate::from_ymd_opt(2025, 11, 6).unwrap());
        assert_eq!(key.object_key(), "tourist_data/2025/11/06.jsonl");
    }

    #[test]
    fn test_site_month_key_path() {
        let key = SiteMonthKey::new(2025, 1, "M50/创意园");
        assert_eq!(key.object_key(), "tourist_data/2025/01/M50_创意园.jsonl");
    }

    #[test]
    fn test_keys_order_chronologically() {
        let a = DayKey { year: 2024, month: 12, day: 31 };
        let b = DayKey { year: 2025, month: 1, day: 1 };
        assert!(a < b);
    }

    #[test]
    fn test_months_covering_year_boundary() {
        let from = NaiveDate::from_ymd_opt(2024, 11, 20).unwrap();
        let to = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        assert_eq!(months_covering(from, to), vec![(2024, 11), (2024, 12), (2025, 1)]);
        assert!(months_covering(to, from).is_empty());
    }

    #[test]
    fn test_is_current_layout() {
        assert!(is_current_layout("tourist_data/2025/11/20.jsonl", DATA_PREFIX));
        assert!(is_current_layout("tourist_data/2025/11/豫园.jsonl", DATA_PREFIX));
        assert!(!is_current_layout(
            "tourist_data/by_date/2025/11/06/tourist_data.json",
            DATA_PREFIX
        ));
        assert!(!is_current_layout("tourist_data/by_name/豫园/data.json", DATA_PREFIX));
    }
}
