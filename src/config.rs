//! Run configuration.
//!
//! [`OverviewConfig`] is the explicit parameter set of the aggregation core.
//! [`StoreConfig`] carries object-store credentials and is only ever read by
//! the binary, from the environment.

use anyhow::{Context, Result};
use chrono::NaiveTime;

use crate::error::ConfigError;

pub const DEFAULT_GRID_START: &str = "09:00";
pub const DEFAULT_GRID_END: &str = "23:00";
pub const DEFAULT_STEP_MINUTES: u32 = 30;
pub const DEFAULT_WINDOW_DAYS: u32 = 5;
pub const DEFAULT_TOP_N: usize = 10;
pub const DEFAULT_DETAIL_DAYS: u32 = 30;

pub const DEFAULT_OSS_ENDPOINT: &str = "oss-cn-shanghai.aliyuncs.com";
pub const DEFAULT_OSS_BUCKET: &str = "shanghai-tourist-traffic";
pub const DEFAULT_OSS_REGION: &str = "oss-cn-shanghai";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverviewConfig {
    pub grid_start: NaiveTime,
    pub grid_end: NaiveTime,
    /// Minutes between grid points.
    pub step_minutes: u32,
    /// Number of most recent calendar days aggregated together.
    pub window_days: u32,
    pub top_n: usize,
    /// How far back a site's detail history reaches.
    pub detail_days: u32,
}

impl Default for OverviewConfig {
    fn default() -> Self {
        Self {
            grid_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            grid_end: NaiveTime::from_hms_opt(23, 0, 0).unwrap_or_default(),
            step_minutes: DEFAULT_STEP_MINUTES,
            window_days: DEFAULT_WINDOW_DAYS,
            top_n: DEFAULT_TOP_N,
            detail_days: DEFAULT_DETAIL_DAYS,
        }
    }
}

impl OverviewConfig {
    /// Builds a config from `HH:MM` grid bounds, validating it.
    pub fn from_parts(
        grid_start: &str,
        grid_end: &str,
        step_minutes: u32,
        window_days: u32,
        top_n: usize,
        detail_days: u32,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            grid_start: parse_time_of_day(grid_start)?,
            grid_end: parse_time_of_day(grid_end)?,
            step_minutes,
            window_days,
            top_n,
            detail_days,
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations that cannot produce a usable run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_end < self.grid_start {
            return Err(ConfigError::GridEndBeforeStart {
                start: self.grid_start,
                end: self.grid_end,
            });
        }
        if self.step_minutes == 0 {
            return Err(ConfigError::NonPositiveStep);
        }
        if self.window_days == 0 {
            return Err(ConfigError::NonPositiveWindow);
        }
        Ok(())
    }
}

pub fn parse_time_of_day(s: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|_| ConfigError::InvalidTime(s.to_string()))
}

/// Credentials and location of the S3-compatible bucket holding raw readings.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub access_key_id: String,
    pub access_key_secret: String,
    pub endpoint: String,
    pub bucket: String,
    pub region: String,
}

impl StoreConfig {
    /// Reads `OSS_*` variables. Credentials are required, the rest default.
    pub fn from_env() -> Result<Self> {
        let access_key_id =
            std::env::var("OSS_ACCESS_KEY_ID").context("OSS_ACCESS_KEY_ID must be set")?;
        let access_key_secret =
            std::env::var("OSS_ACCESS_KEY_SECRET").context("OSS_ACCESS_KEY_SECRET must be set")?;
        let endpoint =
            std::env::var("OSS_ENDPOINT").unwrap_or_else(|_| DEFAULT_OSS_ENDPOINT.to_string());
        let bucket =
            std::env::var("OSS_BUCKET_NAME").unwrap_or_else(|_| DEFAULT_OSS_BUCKET.to_string());
        let region =
            std::env::var("OSS_REGION").unwrap_or_else(|_| DEFAULT_OSS_REGION.to_string());

        Ok(Self {
            access_key_id,
            access_key_secret,
            endpoint,
            bucket,
            region,
        })
    }

    /// Endpoint as a URL, adding `https://` when the scheme is omitted.
    pub fn endpoint_url(&self) -> String {
        if self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://") {
            self.endpoint.clone()
        } else {
            format!("https://{}", self.endpoint)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = OverviewConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.grid_start, parse_time_of_day(DEFAULT_GRID_START).unwrap());
        assert_eq!(config.grid_end, parse_time_of_day(DEFAULT_GRID_END).unwrap());
        assert_eq!(config.step_minutes, 30);
        assert_eq!(config.window_days, 5);
        assert_eq!(config.top_n, 10);
    }

    #[test]
    fn test_end_before_start_is_fatal() {
        let err = OverviewConfig::from_parts("18:00", "09:00", 30, 5, 10, 30).unwrap_err();
        assert!(matches!(err, ConfigError::GridEndBeforeStart { .. }));
    }

    #[test]
    fn test_zero_step_and_window_are_fatal() {
        assert_eq!(
            OverviewConfig::from_parts("09:00", "23:00", 0, 5, 10, 30).unwrap_err(),
            ConfigError::NonPositiveStep
        );
        assert_eq!(
            OverviewConfig::from_parts("09:00", "23:00", 30, 0, 10, 30).unwrap_err(),
            ConfigError::NonPositiveWindow
        );
    }

    #[test]
    fn test_bad_time_string() {
        assert_eq!(
            parse_time_of_day("nine").unwrap_err(),
            ConfigError::InvalidTime("nine".to_string())
        );
    }

    #[test]
    fn test_endpoint_url_adds_scheme() {
        let config = StoreConfig {
            access_key_id: "id".into(),
            access_key_secret: "secret".into(),
            endpoint: DEFAULT_OSS_ENDPOINT.into(),
            bucket: DEFAULT_OSS_BUCKET.into(),
            region: DEFAULT_OSS_REGION.into(),
        };
        assert_eq!(config.endpoint_url(), "https://oss-cn-shanghai.aliyuncs.com");
    }
}
