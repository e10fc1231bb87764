pub mod memory;
pub mod models;
pub mod sqlite;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{FingerprintKey, HistoricalPoint, InventoryRecord};

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryQuery {
    Fingerprint(FingerprintKey),
    /// Raw or canonical names; backends canonicalize before lookup.
    Model { manufacturer: String, model: String },
}

/// Durable backing for the inventory projection and the price event log.
///
/// Any error is a `StorageUnavailable`-class failure for the pass that hit it.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn load_active_records(&self) -> Result<HashMap<FingerprintKey, InventoryRecord>>;

    /// ACTIVE and DELISTED rows. The resolver needs DELISTED ones to detect relistings.
    async fn load_all_records(&self) -> Result<HashMap<FingerprintKey, InventoryRecord>>;

    /// Upsert by fingerprint.
    async fn save(&self, records: &[InventoryRecord]) -> Result<()>;

    async fn append_history(&self, points: &[HistoricalPoint]) -> Result<()>;

    /// Write one resolved pass, all or nothing: on error neither records nor points are stored.
    async fn commit_pass(&self, records: &[InventoryRecord], points: &[HistoricalPoint]) -> Result<()>;

    /// Timestamp ascending.
    async fn load_history(&self, query: &HistoryQuery) -> Result<Vec<HistoricalPoint>>;
}
