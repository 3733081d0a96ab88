use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Days, FixedOffset, NaiveDate};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::analyzers::compute_overview;
use crate::analyzers::dedup::dedup_history;
use crate::analyzers::normalize::parse_timestamp;
use crate::analyzers::types::{Overview, SiteDetail};
use crate::config::OverviewConfig;
use crate::layout::{DayKey, SiteMonthKey, months_covering, sanitize_filename};
use crate::output::{rows_from_day_file, spots_from_site_file};
use crate::reading::RawReading;
use crate::store::{ObjectStore, write_json};

pub const OVERVIEW_FILE: &str = "overview.json";
pub const SPOTS_DIR: &str = "spots/";

/// What a build wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub days_with_visitors: usize,
    pub sites: usize,
    pub details_written: usize,
}

/// The `window` calendar days ending with `today`, oldest first.
pub fn window_days(today: NaiveDate, window: u32) -> Vec<NaiveDate> {
    (0..window)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(u64::from(back))))
        .collect()
}

/// Reads one day file. Read failures are logged and yield no readings.
pub async fn load_day<S: ObjectStore + ?Sized>(store: &S, day: NaiveDate) -> Vec<RawReading> {
    let key = DayKey::from_date(day).object_key();
    match store.get(&key).await {
        Ok(Some(bytes)) => rows_from_day_file(&bytes),
        Ok(None) => {
            warn!(key = %key, "Day file does not exist");
            Vec::new()
        }
        Err(e) => {
            warn!(key = %key, error = %e, "Failed to read day file");
            Vec::new()
        }
    }
}

/// Loads every day concurrently and returns them ordered by date.
pub async fn load_window<S: ObjectStore + ?Sized + 'static>(
    store: &Arc<S>,
    days: &[NaiveDate],
) -> Result<BTreeMap<NaiveDate, Vec<RawReading>>> {
    let mut tasks = JoinSet::new();
    for &day in days {
        let store = Arc::clone(store);
        tasks.spawn(async move { (day, load_day(&*store, day).await) });
    }

    let mut loaded = BTreeMap::new();
    while let Some(joined) = tasks.join_next().await {
        let (day, readings) = joined?;
        loaded.insert(day, readings);
    }
    Ok(loaded)
}

/// Builds the overview from the stored day files and writes it to `sink`.
#[tracing::instrument(skip_all, fields(now = %now, window_days = config.window_days))]
pub async fn build_overview<S, T>(
    source: &Arc<S>,
    sink: &T,
    output_prefix: &str,
    config: &OverviewConfig,
    now: DateTime<FixedOffset>,
) -> Result<Overview>
where
    S: ObjectStore + ?Sized + 'static,
    T: ObjectStore + ?Sized,
{
    config.validate()?;

    let days = window_days(now.date_naive(), config.window_days);
    let loaded = load_window(source, &days).await?;

    for (day, readings) in &loaded {
        if readings.is_empty() {
            warn!(day = %day, "No readings for day, trend will be zero");
        } else {
            info!(day = %day, readings = readings.len(), "Day loaded");
        }
    }

    let overview = compute_overview(&loaded, config, now)?;

    let key = format!("{output_prefix}{OVERVIEW_FILE}");
    write_json(sink, &key, &overview).await?;
    info!(
        key = %key,
        sites = overview.all_sites.len(),
        top = overview.top_sites.len(),
        "Overview written"
    );

    Ok(overview)
}

/// Loads a site's readings from the last `detail_days` days.
///
/// Month files are read whole and then cut to the window by each reading's
/// `TIME`. Readings whose time does not parse are dropped.
pub async fn load_site_history<S: ObjectStore + ?Sized>(
    store: &S,
    site_name: &str,
    today: NaiveDate,
    detail_days: u32,
) -> Vec<RawReading> {
    let from = today
        .checked_sub_days(Days::new(u64::from(detail_days.saturating_sub(1))))
        .unwrap_or(today);

    let mut history = Vec::new();
    for (year, month) in months_covering(from, today) {
        let key = SiteMonthKey::new(year, month, site_name).object_key();
        match store.get(&key).await {
            Ok(Some(bytes)) => history.extend(
                spots_from_site_file(&bytes)
                    .into_iter()
                    .filter(|spot| within_window(spot, from, today)),
            ),
            Ok(None) => {}
            Err(e) => warn!(key = %key, error = %e, "Failed to read site file"),
        }
    }
    history
}

fn within_window(spot: &RawReading, from: NaiveDate, today: NaiveDate) -> bool {
    spot.time()
        .and_then(|time| parse_timestamp(time, today))
        .is_some_and(|t| (from..=today).contains(&t.date()))
}

/// Writes a deduplicated detail file for every named site in `listing`.
///
/// Returns how many detail files were written.
#[tracing::instrument(skip_all, fields(sites = listing.len(), today = %today))]
pub async fn build_site_details<S, T>(
    source: &S,
    sink: &T,
    output_prefix: &str,
    listing: &[RawReading],
    today: NaiveDate,
    detail_days: u32,
) -> Result<usize>
where
    S: ObjectStore + ?Sized,
    T: ObjectStore + ?Sized,
{
    let mut written = 0;

    for site in listing {
        let Some(name) = site.name() else {
            continue;
        };

        let history = load_site_history(source, name, today, detail_days).await;
        if history.is_empty() {
            info!(site = %name, "No detail history");
            continue;
        }

        let detail = SiteDetail {
            name: name.to_string(),
            data: dedup_history(history),
        };
        let key = format!("{output_prefix}{SPOTS_DIR}{}.json", sanitize_filename(name));
        write_json(sink, &key, &detail).await?;
        written += 1;
    }

    info!(written, "Site details written");
    Ok(written)
}

/// Builds the overview and every site's detail file.
pub async fn analyze<S, T>(
    source: &Arc<S>,
    sink: &T,
    output_prefix: &str,
    config: &OverviewConfig,
    now: DateTime<FixedOffset>,
) -> Result<BuildReport>
where
    S: ObjectStore + ?Sized + 'static,
    T: ObjectStore + ?Sized,
{
    let overview = build_overview(source, sink, output_prefix, config, now).await?;

    let days_with_visitors = overview
        .trend_series
        .iter()
        .filter(|line| line.values.iter().any(|v| *v > 0))
        .count();

    let details_written = build_site_details(
        &**source,
        sink,
        output_prefix,
        &overview.all_sites,
        now.date_naive(),
        config.detail_days,
    )
    .await?;

    Ok(BuildReport {
        days_with_visitors,
        sites: overview.all_sites.len(),
        details_written,
    })
}
