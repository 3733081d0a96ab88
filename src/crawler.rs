//! Snapshot collection.
//!
//! Each crawl fetches one snapshot and appends it twice: whole, to the day
//! file, and row by row, to each site's month file.

use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use tracing::{error, info, warn};

use crate::layout::{DayKey, SiteMonthKey, UNKNOWN_SITE};
use crate::output::{DayRecord, SiteRecord, encode_lines};
use crate::services::tourist_api::TouristApi;
use crate::store::ObjectStore;

/// What a single crawl managed to store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    pub day_written: bool,
    pub sites_total: usize,
    pub sites_written: usize,
}

impl CrawlReport {
    /// True when the snapshot had rows and every write succeeded.
    pub fn is_complete(&self) -> bool {
        self.day_written && self.sites_total > 0 && self.sites_written == self.sites_total
    }
}

/// Fetches one snapshot and stores it, stamped with `now`.
///
/// A failed fetch is an error. Failed writes are logged and reported.
#[tracing::instrument(skip_all, fields(now = %now))]
pub async fn crawl_once<A, S>(api: &A, store: &S, now: DateTime<FixedOffset>) -> Result<CrawlReport>
where
    A: TouristApi + ?Sized,
    S: ObjectStore + ?Sized,
{
    let mut snapshot = api.fetch_snapshot().await?;
    let timestamp = now.to_rfc3339();
    let date = now.date_naive();
    snapshot.fetch_time = Some(timestamp.clone());

    let rows = snapshot.rows.clone();
    let day_key = DayKey::from_date(date).object_key();
    let day_record = DayRecord {
        timestamp: timestamp.clone(),
        data: snapshot,
    };

    let day_written = match append_record(store, &day_key, &day_record).await {
        Ok(()) => {
            info!(key = %day_key, "Snapshot appended to day file");
            true
        }
        Err(e) => {
            error!(key = %day_key, error = %e, "Failed to append snapshot to day file");
            false
        }
    };

    if rows.is_empty() {
        warn!("Snapshot has no rows, nothing to store per site");
    }

    let sites_total = rows.len();
    let mut sites_written = 0;

    for spot in rows {
        let name = spot.name().unwrap_or(UNKNOWN_SITE).to_string();
        let key = SiteMonthKey::from_date(date, &name).object_key();
        let record = SiteRecord {
            timestamp: timestamp.clone(),
            spot,
        };

        match append_record(store, &key, &record).await {
            Ok(()) => sites_written += 1,
            Err(e) => error!(site = %name, key = %key, error = %e, "Failed to append site reading"),
        }
    }

    let report = CrawlReport {
        day_written,
        sites_total,
        sites_written,
    };
    info!(
        day_written,
        sites_written,
        sites_total,
        complete = report.is_complete(),
        "Crawl finished"
    );
    Ok(report)
}

async fn append_record<S, T>(store: &S, key: &str, record: &T) -> Result<()>
where
    S: ObjectStore + ?Sized,
    T: serde::Serialize + Sync,
{
    let line = encode_lines(std::slice::from_ref(record))?;
    store.append(key, &line).await
}
