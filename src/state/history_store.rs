use std::collections::BTreeSet;

use dashmap::DashMap;

use crate::fingerprint::model_line;
use crate::types::{FingerprintKey, HistoricalPoint};

// ---------------------------------------------------------------------------
// HistoryStore: append-only price event log
// ---------------------------------------------------------------------------

/// In-memory price history with the two indices the read paths need.
///
/// There is no update or delete: a correction is a new point. Each per-fingerprint series
/// is kept sorted on insert, so reads never sort the whole log.
#[derive(Debug, Default)]
pub struct HistoryStore {
    /// fingerprint → points, timestamp ascending (ties in insertion order)
    by_fingerprint: DashMap<FingerprintKey, Vec<HistoricalPoint>>,
    /// canonical (manufacturer, model) → fingerprints with at least one point
    by_model: DashMap<(String, String), BTreeSet<FingerprintKey>>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, point: HistoricalPoint) {
        let (manufacturer, model) = point.fingerprint.model_line();
        self.by_model
            .entry((manufacturer.to_string(), model.to_string()))
            .or_default()
            .insert(point.fingerprint.clone());

        let mut series = self.by_fingerprint.entry(point.fingerprint.clone()).or_default();
        let at = series.partition_point(|p| p.timestamp <= point.timestamp);
        series.insert(at, point);
    }

    pub fn append_all(&self, points: impl IntoIterator<Item = HistoricalPoint>) {
        for point in points {
            self.append(point);
        }
    }

    pub fn query(&self, fingerprint: &FingerprintKey) -> Vec<HistoricalPoint> {
        self.by_fingerprint
            .get(fingerprint)
            .map(|series| series.clone())
            .unwrap_or_default()
    }

    /// Every series under a model line, merged by timestamp. Arguments are canonicalized
    /// the same way fingerprints are, so "S&W"/"m&p9" finds "SMITH & WESSON"/"M&P9".
    pub fn query_by_model(&self, manufacturer: &str, model: &str) -> Vec<HistoricalPoint> {
        let line = model_line(manufacturer, model);
        let fingerprints: Vec<FingerprintKey> = match self.by_model.get(&line) {
            Some(set) => set.iter().cloned().collect(),
            None => return Vec::new(),
        };
        let mut merged: Vec<HistoricalPoint> = fingerprints.iter().flat_map(|fp| self.query(fp)).collect();
        // Stable: equal timestamps stay grouped by fingerprint order.
        merged.sort_by_key(|p| p.timestamp);
        merged
    }

    pub fn len(&self) -> usize {
        self.by_fingerprint.iter().map(|series| series.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    fn t(h: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(h)
    }

    fn point(fp: &FingerprintKey, at: DateTime<Utc>, price: i64) -> HistoricalPoint {
        HistoricalPoint {
            fingerprint: fp.clone(),
            timestamp: at,
            price: Decimal::from(price),
            estimated_value: Decimal::from(500),
        }
    }

    #[test]
    fn query_orders_by_timestamp_even_when_appended_out_of_order() {
        let store = HistoryStore::new();
        assert!(store.is_empty());
        let fp = FingerprintKey::new("GLOCK", "19", "9MM");
        store.append(point(&fp, t(5), 425));
        store.append(point(&fp, t(1), 450));
        store.append(point(&fp, t(9), 440));

        let prices: Vec<Decimal> = store.query(&fp).iter().map(|p| p.price).collect();
        assert_eq!(prices, vec![Decimal::from(450), Decimal::from(425), Decimal::from(440)]);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let store = HistoryStore::new();
        let fp = FingerprintKey::new("GLOCK", "19", "9MM");
        store.append(point(&fp, t(1), 450));
        store.append(point(&fp, t(1), 430));
        let prices: Vec<Decimal> = store.query(&fp).iter().map(|p| p.price).collect();
        assert_eq!(prices, vec![Decimal::from(450), Decimal::from(430)]);
    }

    #[test]
    fn model_query_merges_calibers() {
        let store = HistoryStore::new();
        let nine = FingerprintKey::new("SMITH & WESSON", "M&P", "9MM");
        let forty = FingerprintKey::new("SMITH & WESSON", "M&P", "40 S&W");
        let other = FingerprintKey::new("SMITH & WESSON", "686", "357 MAG");
        store.append(point(&nine, t(2), 400));
        store.append(point(&forty, t(1), 380));
        store.append(point(&other, t(0), 800));

        let merged = store.query_by_model("S&W", "m&p");
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].fingerprint, forty);
        assert_eq!(merged[1].fingerprint, nine);
        assert!(store.query_by_model("Glock", "19").is_empty());
        assert_eq!(store.len(), 3);
    }
}
