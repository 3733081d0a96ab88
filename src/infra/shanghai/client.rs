use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::fetch::{BasicClient, BrowserHeaders, HttpClient, fetch_bytes};
use crate::parser::{Snapshot, parse_snapshot};
use crate::services::tourist_api::TouristApi;

pub const API_URL: &str = "https://tourist.whlyj.sh.gov.cn/api/statistics/getViewTourist";
pub const REFERER: &str = "https://tourist.whlyj.sh.gov.cn/";

/// Client for the Shanghai culture and tourism bureau's live visitor API.
pub struct ShanghaiTouristClient<C> {
    http: C,
    url: String,
}

impl ShanghaiTouristClient<BrowserHeaders<BasicClient>> {
    pub fn new() -> Result<Self> {
        let http = BrowserHeaders::new(BasicClient::new()?, REFERER)?;
        Ok(Self::with_client(http, API_URL))
    }
}

impl<C: HttpClient> ShanghaiTouristClient<C> {
    pub fn with_client(http: C, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl<C: HttpClient> TouristApi for ShanghaiTouristClient<C> {
    #[tracing::instrument(skip(self), fields(url = %self.url))]
    async fn fetch_snapshot(&self) -> Result<Snapshot> {
        let bytes = fetch_bytes(&self.http, &self.url)
            .await
            .context("snapshot request failed")?;
        debug!(bytes = bytes.len(), "Snapshot bytes received, parsing");

        let snapshot = parse_snapshot(&bytes).context("failed to parse snapshot")?;
        check_status(&snapshot)?;

        info!(
            total = snapshot.reported_total(),
            rows = snapshot.rows.len(),
            "Snapshot fetched"
        );
        Ok(snapshot)
    }
}

fn check_status(snapshot: &Snapshot) -> Result<()> {
    if snapshot.is_ok() {
        return Ok(());
    }
    Err(anyhow::anyhow!(
        "API returned code {}: {}",
        snapshot.code.map_or_else(|| "none".to_string(), |c| c.to_string()),
        snapshot.msg.as_deref().unwrap_or("unknown error")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_snapshot;

    #[test]
    fn test_check_status_accepts_200() {
        let snapshot = parse_snapshot(br#"{"code": 200, "rows": []}"#).unwrap();
        assert!(check_status(&snapshot).is_ok());
    }

    #[test]
    fn test_check_status_reports_message() {
        let snapshot = parse_snapshot(br#"{"code": 403, "msg": "forbidden"}"#).unwrap();
        let err = check_status(&snapshot).unwrap_err();
        assert_eq!(err.to_string(), "API returned code 403: forbidden");
    }

    #[test]
    fn test_check_status_without_code() {
        let snapshot = parse_snapshot(br#"{"rows": []}"#).unwrap();
        let err = check_status(&snapshot).unwrap_err();
        assert_eq!(err.to_string(), "API returned code none: unknown error");
    }
}
