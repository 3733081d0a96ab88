use chrono::{Duration, NaiveTime};

use crate::config::OverviewConfig;
use crate::error::ConfigError;

/// Fixed, strictly increasing time-of-day points shared by every day of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeGrid {
    points: Vec<NaiveTime>,
}

impl TimeGrid {
    /// Points from `start` to `end` inclusive, `step_minutes` apart.
    ///
    /// `end` is only included when it falls on a step. The grid stops at
    /// midnight rather than wrapping into the next day.
    pub fn new(start: NaiveTime, end: NaiveTime, step_minutes: u32) -> Result<Self, ConfigError> {
        if end < start {
            return Err(ConfigError::GridEndBeforeStart { start, end });
        }
        if step_minutes == 0 {
            return Err(ConfigError::NonPositiveStep);
        }

        let step = Duration::minutes(i64::from(step_minutes));
        let mut points = Vec::new();
        let mut current = start;

        while current <= end {
            points.push(current);
            let (next, wrapped) = current.overflowing_add_signed(step);
            if wrapped != 0 {
                break;
            }
            current = next;
        }

        Ok(Self { points })
    }

    pub fn from_config(config: &OverviewConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Self::new(config.grid_start, config.grid_end, config.step_minutes)
    }

    pub fn points(&self) -> &[NaiveTime] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// `HH:MM` labels, one per point.
    pub fn labels(&self) -> Vec<String> {
        self.points
            .iter()
            .map(|t| t.format("%H:%M").to_string())
            .collect()
    }
}
