//! Migration of legacy stored files into the `YYYY/MM/` layout.
//!
//! Older crawler versions wrote whole JSON documents per day
//! (`by_date/.../tourist_data.json`) and per site (`by_name/<site>/data.json`).
//! Their records are regrouped into day and site-month JSON-lines files, the
//! old object is backed up under `_backup/` and then removed.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use crate::layout::{BACKUP_DIR, DayKey, SiteMonthKey, UNKNOWN_SITE, is_current_layout};
use crate::output::encode_lines;
use crate::reading::FIELD_NAME;
use crate::store::ObjectStore;

/// Records regrouped by destination.
#[derive(Debug, Default, PartialEq)]
pub struct Grouped {
    pub daily: BTreeMap<DayKey, Vec<Value>>,
    pub sites: BTreeMap<SiteMonthKey, Vec<Value>>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub found: usize,
    pub migrated: usize,
    pub failed: usize,
}

/// Extracts records from a legacy file body.
///
/// Whole-document formats are tried first, then JSON lines.
pub fn parse_legacy(bytes: &[u8]) -> Vec<Value> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(document) => records_from_document(document),
        Err(_) => {
            let text = String::from_utf8_lossy(bytes);
            text.lines()
                .filter(|line| !line.trim().is_empty())
                .filter_map(|line| match serde_json::from_str(line) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!(error = %e, "Skipping unparseable legacy line");
                        None
                    }
                })
                .collect()
        }
    }
}

fn records_from_document(document: Value) -> Vec<Value> {
    match document {
        Value::Object(mut object) => {
            let wrapped = object.get("data").is_some_and(Value::is_array)
                && (object.contains_key("date") || object.contains_key("spot_name"));
            if wrapped {
                let Some(Value::Array(items)) = object.remove("data") else {
                    return Vec::new();
                };
                if object.contains_key("date") {
                    // by_date: each item is a whole snapshot
                    return items
                        .into_iter()
                        .filter_map(|item| {
                            let timestamp = item.get("fetch_time")?.clone();
                            Some(json!({"timestamp": timestamp, "data": item}))
                        })
                        .collect();
                }
                // by_name: each item is one site row
                return items
                    .into_iter()
                    .filter_map(|item| {
                        let time = item.get("TIME")?.as_str()?.trim().to_string();
                        if time.is_empty() {
                            return None;
                        }
                        let timestamp = NaiveDateTime::parse_from_str(&time, "%Y-%m-%d %H:%M")
                            .map(|t| t.format("%Y-%m-%dT%H:%M:%S").to_string())
                            .unwrap_or(time);
                        Some(json!({"timestamp": timestamp, "spot": item}))
                    })
                    .collect();
            }
            match object.remove("records") {
                Some(Value::Array(records)) => records,
                Some(other) => {
                    object.insert("records".to_string(), other);
                    vec![Value::Object(object)]
                }
                None => vec![Value::Object(object)],
            }
        }
        Value::Array(records) => records,
        other => vec![other],
    }
}

/// Parses the timestamp formats legacy records carry and returns the date.
pub fn record_date(timestamp: &str) -> Option<NaiveDate> {
    let timestamp = timestamp.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(t.date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(timestamp, format).ok())
        .map(|t| t.date())
}

/// Groups records by day and by site-month.
///
/// Records without a parseable `timestamp` are dropped.
pub fn group_records(records: Vec<Value>) -> Grouped {
    let mut grouped = Grouped::default();

    for record in records {
        let Some(timestamp) = record
            .get("timestamp")
            .and_then(Value::as_str)
            .map(str::to_string)
        else {
            warn!("Legacy record without timestamp skipped");
            continue;
        };
        let Some(date) = record_date(&timestamp) else {
            warn!(timestamp = %timestamp, "Legacy record with unparseable timestamp skipped");
            continue;
        };

        if let Some(rows) = record.pointer("/data/rows").and_then(Value::as_array) {
            for spot in rows {
                let key = SiteMonthKey::from_date(date, site_name(spot));
                grouped
                    .sites
                    .entry(key)
                    .or_default()
                    .push(json!({"timestamp": timestamp, "spot": spot}));
            }
        } else if let Some(spot) = record.get("spot") {
            let key = SiteMonthKey::from_date(date, site_name(spot));
            grouped.sites.entry(key).or_default().push(record.clone());
        }

        grouped
            .daily
            .entry(DayKey::from_date(date))
            .or_default()
            .push(record);
    }

    grouped
}

fn site_name(spot: &Value) -> &str {
    spot.get(FIELD_NAME)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(UNKNOWN_SITE)
}

/// Where `key` is backed up before deletion.
pub fn backup_key(key: &str, prefix: &str) -> String {
    match key.strip_prefix(prefix) {
        Some(rest) => format!("{prefix}{BACKUP_DIR}{rest}"),
        None => format!("{BACKUP_DIR}{key}"),
    }
}

pub struct Migrator<'a, S: ?Sized> {
    store: &'a S,
    prefix: String,
    dry_run: bool,
}

impl<'a, S: ObjectStore + ?Sized> Migrator<'a, S> {
    pub fn new(store: &'a S, prefix: impl Into<String>, dry_run: bool) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            dry_run,
        }
    }

    /// Keys under the prefix that are neither migrated nor backups.
    pub async fn list_legacy(&self) -> Result<Vec<String>> {
        let backups = format!("{}{BACKUP_DIR}", self.prefix);
        let keys = self.store.list(&self.prefix).await?;

        Ok(keys
            .into_iter()
            .filter(|key| {
                if key.starts_with(&backups) {
                    return false;
                }
                if is_current_layout(key, &self.prefix) {
                    debug!(key = %key, "Already in current layout");
                    return false;
                }
                true
            })
            .collect())
    }

    /// Migrates one object. Returns whether it was fully migrated.
    #[tracing::instrument(skip(self), fields(dry_run = self.dry_run))]
    pub async fn migrate_object(&self, key: &str) -> Result<bool> {
        let Some(bytes) = self.store.get(key).await? else {
            warn!("Object vanished before migration");
            return Ok(false);
        };

        let records = parse_legacy(&bytes);
        if records.is_empty() {
            info!("No usable records, skipping");
            return Ok(false);
        }

        let grouped = group_records(records);
        info!(
            days = grouped.daily.len(),
            sites = grouped.sites.len(),
            "Records grouped"
        );

        let mut ok = true;
        for (day, records) in &grouped.daily {
            ok &= self.write_group(&day.object_key(), records).await;
        }
        for (site, records) in &grouped.sites {
            ok &= self.write_group(&site.object_key(), records).await;
        }

        if !ok {
            warn!("Some writes failed, keeping the legacy object");
            return Ok(false);
        }

        let backup = backup_key(key, &self.prefix);
        if self.dry_run {
            info!(backup = %backup, "[dry run] would back up and delete");
            return Ok(true);
        }

        self.store.copy(key, &backup).await?;
        self.store.delete(key).await?;
        info!(backup = %backup, "Legacy object backed up and deleted");
        Ok(true)
    }

    async fn write_group(&self, key: &str, records: &[Value]) -> bool {
        if records.is_empty() {
            return true;
        }
        if self.dry_run {
            info!(key, records = records.len(), "[dry run] would append");
            return true;
        }

        let result = match encode_lines(records) {
            Ok(body) => self.store.append(key, &body).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                info!(key, records = records.len(), "Records appended");
                true
            }
            Err(e) => {
                error!(key, error = %e, "Failed to append records");
                false
            }
        }
    }

    /// Migrates every legacy object under the prefix.
    pub async fn run(&self) -> Result<MigrationReport> {
        let legacy = self.list_legacy().await?;
        let mut report = MigrationReport {
            found: legacy.len(),
            ..Default::default()
        };

        if legacy.is_empty() {
            info!(prefix = %self.prefix, "No legacy objects found");
            return Ok(report);
        }
        info!(found = legacy.len(), dry_run = self.dry_run, "Migrating legacy objects");

        for key in &legacy {
            match self.migrate_object(key).await {
                Ok(true) => report.migrated += 1,
                Ok(false) => report.failed += 1,
                Err(e) => {
                    error!(key = %key, error = %e, "Migration failed");
                    report.failed += 1;
                }
            }
        }

        info!(
            migrated = report.migrated,
            failed = report.failed,
            total = report.found,
            "Migration finished"
        );
        Ok(report)
    }
}
