use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::time::interval;
use tracing::{debug, error, info};

use crate::engine::{Engine, PassReport};
use crate::error::Result;
use crate::ingest::read_snapshot;

/// Background task that runs one scrape pass each time the scraper rewrites its snapshot.
///
/// A pass that fails (bad file, storage down) leaves the remembered mtime untouched, so the
/// same snapshot is retried on the next tick.
pub struct SnapshotWatcher {
    path: PathBuf,
    every: Duration,
    engine: Arc<Engine>,
    last_mtime: Option<SystemTime>,
}

impl SnapshotWatcher {
    pub fn new(path: impl Into<PathBuf>, every: Duration, engine: Arc<Engine>) -> Self {
        Self {
            path: path.into(),
            every,
            engine,
            last_mtime: None,
        }
    }

    pub async fn run(mut self) {
        let mut ticker = interval(self.every);
        // First tick fires immediately: a snapshot already on disk is picked up at startup.
        loop {
            ticker.tick().await;
            if let Err(e) = self.check().await {
                error!(path = %self.path.display(), "Snapshot pass failed: {e}");
            }
        }
    }

    /// Run a pass if the snapshot changed since the last successful one.
    pub async fn check(&mut self) -> Result<Option<PassReport>> {
        let modified = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta.modified()?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no snapshot yet");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        if self.last_mtime == Some(modified) {
            return Ok(None);
        }

        let (listings, stats) = read_snapshot(&self.path).await?;
        info!(
            total = stats.rows_total,
            accepted = stats.accepted,
            rejected = stats.rejected(),
            "[INGEST] {} rows, {} accepted | rejected: no_price={} bad_price={} negative={} not_object={} oversized={} | suspicious={} truncated={}",
            stats.rows_total,
            stats.accepted,
            stats.rejected_missing_price,
            stats.rejected_bad_price,
            stats.rejected_negative_price,
            stats.rejected_not_object,
            stats.rejected_oversized_field,
            stats.suspicious_price,
            stats.truncated_text,
        );
        if !stats.bad_price_samples.is_empty() {
            info!("[INGEST] unparseable prices: {:?}", stats.bad_price_samples);
        }

        let report = self.engine.run_pass(listings).await?;
        self.last_mtime = Some(modified);
        Ok(Some(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStorage;

    fn temp_snapshot(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("gunrack-{}-{name}.json", std::process::id()));
        std::fs::write(&path, body).unwrap();
        path
    }

    #[tokio::test]
    async fn runs_once_per_snapshot_version() {
        let path = temp_snapshot(
            "watch",
            r#"[{"manufacturer": "Glock", "model": "19", "caliber": "9mm", "price": 450, "url": "/g/1"}]"#,
        );
        let engine = Arc::new(Engine::new(Arc::new(MemoryStorage::new())));
        let mut watcher = SnapshotWatcher::new(&path, Duration::from_secs(60), engine.clone());

        let first = watcher.check().await.unwrap().unwrap();
        assert_eq!(first.counts.new, 1);
        assert!(watcher.check().await.unwrap().is_none());
        assert_eq!(engine.health().passes_ok(), 1);

        std::fs::remove_file(&path).unwrap();
        assert!(watcher.check().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unreadable_snapshot_is_retried() {
        let path = temp_snapshot("broken", "[{\"price\": ");
        let engine = Arc::new(Engine::new(Arc::new(MemoryStorage::new())));
        let mut watcher = SnapshotWatcher::new(&path, Duration::from_secs(60), engine);
        assert!(watcher.check().await.is_err());
        assert!(watcher.last_mtime.is_none());
        std::fs::remove_file(&path).unwrap();
    }
}
