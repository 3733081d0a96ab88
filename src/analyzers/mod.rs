//! Occupancy reconstruction and aggregation.
//!
//! Raw readings are normalized into events, replayed day by day across a
//! fixed time grid, merged over a window of days, and finally ranked into
//! the overview consumed by the web front-end. Nothing in here performs I/O.

pub mod aggregate;
pub mod analyzer;
pub mod dedup;
pub mod grid;
pub mod normalize;
pub mod rank;
pub mod replay;
pub mod types;

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate};

use crate::config::OverviewConfig;
use crate::error::OverviewError;
use crate::reading::RawReading;

use self::aggregate::aggregate_window;
use self::grid::TimeGrid;
use self::rank::build_overview;
use self::types::Overview;

/// Runs the whole core over an ordered set of days.
///
/// The configuration is validated before any reading is looked at.
pub fn compute_overview(
    days: &BTreeMap<NaiveDate, Vec<RawReading>>,
    config: &OverviewConfig,
    generated_at: DateTime<FixedOffset>,
) -> Result<Overview, OverviewError> {
    let grid = TimeGrid::from_config(config)?;
    let summary = aggregate_window(days, &grid)?;
    Ok(build_overview(summary, &grid, config.top_n, generated_at))
}
