use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::analyzer::trends::model_lines;
use crate::analyzer::{analyze, AnalyticsResult, AnalyzeOptions};
use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::db::{HistoryQuery, Storage};
use crate::error::Result;
use crate::resolver::{resolve, Collision, Decision, PassCounts, ValuedListing};
use crate::types::{FingerprintKey, HistoricalPoint, InventoryRecord, RawListing, RecordStatus};

#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub listings: usize,
    pub counts: PassCounts,
    pub records_written: usize,
    pub points_written: usize,
    pub duration_ms: u64,
    pub decisions: Vec<Decision>,
    pub collisions: Vec<Collision>,
}

/// Runs scrape passes against a storage backend and serves read-side queries.
///
/// One pass at a time: `run_pass` holds `pass_lock` across load, resolve and commit.
/// Reads never take the lock.
pub struct Engine {
    storage: Arc<dyn Storage>,
    pass_lock: Mutex<()>,
    latency: Arc<LatencyStats>,
    health: Arc<HealthState>,
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

impl Engine {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_observers(storage, Arc::new(LatencyStats::new()), Arc::new(HealthState::new()))
    }

    pub fn with_observers(storage: Arc<dyn Storage>, latency: Arc<LatencyStats>, health: Arc<HealthState>) -> Self {
        Self {
            storage,
            pass_lock: Mutex::new(()),
            latency,
            health,
        }
    }

    pub fn latency(&self) -> &Arc<LatencyStats> {
        &self.latency
    }

    pub fn health(&self) -> &Arc<HealthState> {
        &self.health
    }

    /// Resolve one snapshot and commit the result in a single storage call.
    /// On error nothing from this pass has been written.
    pub async fn run_pass(&self, listings: Vec<RawListing>) -> Result<PassReport> {
        let _guard = self.pass_lock.lock().await;
        let started = Instant::now();
        let result = self.run_pass_locked(listings).await;
        let elapsed = started.elapsed();
        self.latency.record(elapsed);

        match result {
            Ok(mut report) => {
                report.duration_ms = elapsed.as_millis() as u64;
                self.health.record_pass_ok(now_ns(), report.counts_touched());
                let c = &report.counts;
                info!(
                    event = "PASS_COMPLETE",
                    listings = report.listings,
                    new = c.new,
                    unchanged = c.unchanged,
                    price_changed = c.price_changed,
                    relisted = c.relisted,
                    delisted = c.delisted,
                    collisions = c.collisions,
                    points = report.points_written,
                    duration_ms = report.duration_ms,
                    "PASS COMPLETE | {} listings | new={} unchanged={} changed={} relisted={} delisted={} | {}ms",
                    report.listings,
                    c.new,
                    c.unchanged,
                    c.price_changed,
                    c.relisted,
                    c.delisted,
                    report.duration_ms,
                );
                Ok(report)
            }
            Err(e) => {
                self.health.record_pass_failed(now_ns());
                error!(
                    event = "PASS_FAILED",
                    storage = e.is_storage_failure(),
                    error = %e,
                    "PASS FAILED | nothing written, retrying next pass: {e}",
                );
                Err(e)
            }
        }
    }

    async fn run_pass_locked(&self, listings: Vec<RawListing>) -> Result<PassReport> {
        let stored = self.storage.load_all_records().await?;
        let listing_count = listings.len();
        let snapshot: Vec<ValuedListing> = listings.into_iter().map(ValuedListing::from_raw).collect();

        let outcome = resolve(snapshot, &stored);
        self.storage
            .commit_pass(&outcome.records_to_save, &outcome.history)
            .await?;

        Ok(PassReport {
            listings: listing_count,
            counts: outcome.counts(),
            records_written: outcome.records_to_save.len(),
            points_written: outcome.history.len(),
            duration_ms: 0,
            decisions: outcome.decisions,
            collisions: outcome.collisions,
        })
    }

    /// Inventory records, fingerprint order. `None` returns every status.
    pub async fn inventory(&self, status: Option<RecordStatus>) -> Result<Vec<InventoryRecord>> {
        let records = match status {
            Some(RecordStatus::Active) => self.storage.load_active_records().await?,
            _ => self.storage.load_all_records().await?,
        };
        let mut records: Vec<InventoryRecord> = records
            .into_values()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .collect();
        records.sort_by(|a, b| a.fingerprint.cmp(&b.fingerprint));
        Ok(records)
    }

    pub async fn history(&self, query: &HistoryQuery) -> Result<Vec<HistoricalPoint>> {
        self.storage.load_history(query).await
    }

    /// Loads the projection and one history query per model line, then runs the pure analyzer.
    pub async fn analytics(&self, opts: &AnalyzeOptions) -> Result<AnalyticsResult> {
        let records = self.inventory(None).await?;
        let mut log: HashMap<FingerprintKey, Vec<HistoricalPoint>> = HashMap::with_capacity(records.len());
        for (manufacturer, model) in model_lines(&records).into_keys() {
            let points = self
                .storage
                .load_history(&HistoryQuery::Model { manufacturer, model })
                .await?;
            // Points arrive timestamp-ascending, so each per-fingerprint series stays ordered.
            for p in points {
                log.entry(p.fingerprint.clone()).or_default().push(p);
            }
        }
        Ok(analyze(
            &records,
            |fp| log.get(fp).cloned().unwrap_or_default(),
            opts,
        ))
    }
}

impl PassReport {
    /// Fingerprints this pass observed (excludes collisions and delistings).
    pub fn counts_touched(&self) -> u64 {
        (self.counts.new + self.counts.unchanged + self.counts.price_changed + self.counts.relisted) as u64
    }
}
