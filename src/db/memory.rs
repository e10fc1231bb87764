use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::Result;
use crate::state::HistoryStore;
use crate::types::{FingerprintKey, HistoricalPoint, InventoryRecord};

use super::{HistoryQuery, Storage};

/// Process-local storage for tests and offline replay. Never fails.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    records: DashMap<FingerprintKey, InventoryRecord>,
    history: HistoryStore,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn load_active_records(&self) -> Result<HashMap<FingerprintKey, InventoryRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|e| e.value().is_active())
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect())
    }

    async fn load_all_records(&self) -> Result<HashMap<FingerprintKey, InventoryRecord>> {
        Ok(self
            .records
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect())
    }

    async fn save(&self, records: &[InventoryRecord]) -> Result<()> {
        for r in records {
            self.records.insert(r.fingerprint.clone(), r.clone());
        }
        Ok(())
    }

    async fn append_history(&self, points: &[HistoricalPoint]) -> Result<()> {
        self.history.append_all(points.iter().cloned());
        Ok(())
    }

    async fn commit_pass(&self, records: &[InventoryRecord], points: &[HistoricalPoint]) -> Result<()> {
        // Neither half can fail, so there is nothing to roll back.
        self.save(records).await?;
        self.append_history(points).await
    }

    async fn load_history(&self, query: &HistoryQuery) -> Result<Vec<HistoricalPoint>> {
        Ok(match query {
            HistoryQuery::Fingerprint(fp) => self.history.query(fp),
            HistoryQuery::Model { manufacturer, model } => self.history.query_by_model(manufacturer, model),
        })
    }
}
