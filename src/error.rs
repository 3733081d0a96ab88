use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

/// Configuration that cannot produce a usable computation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("grid end {end} is before grid start {start}")]
    GridEndBeforeStart { start: NaiveTime, end: NaiveTime },
    #[error("grid step must be a positive number of minutes")]
    NonPositiveStep,
    #[error("window must cover at least one day")]
    NonPositiveWindow,
    #[error("invalid time of day '{0}', expected HH:MM")]
    InvalidTime(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OverviewError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("day {day} added after {previous}; days must be added oldest to newest")]
    DayOutOfOrder { day: NaiveDate, previous: NaiveDate },
}
