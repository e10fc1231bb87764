use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::{premium, FingerprintKey, HistoricalPoint, InventoryRecord};

use super::stats::mean;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTrend {
    pub date: NaiveDate,
    pub points: usize,
    pub mean_price: Decimal,
    pub mean_estimate: Decimal,
    pub mean_premium_pct: f64,
}

/// Price history of one model line across every caliber/fingerprint it was seen under.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSeries {
    pub manufacturer: String,
    pub model: String,
    pub fingerprints: Vec<FingerprintKey>,
    pub points: Vec<HistoricalPoint>,
    pub daily: Vec<DailyTrend>,
}

/// Model lines present in `records` (any status), each with its fingerprints.
pub fn model_lines(records: &[InventoryRecord]) -> BTreeMap<(String, String), BTreeSet<FingerprintKey>> {
    let mut lines: BTreeMap<(String, String), BTreeSet<FingerprintKey>> = BTreeMap::new();
    for r in records.iter().filter(|r| !r.fingerprint.is_unknown()) {
        let (manufacturer, model) = r.fingerprint.model_line();
        lines
            .entry((manufacturer.to_string(), model.to_string()))
            .or_default()
            .insert(r.fingerprint.clone());
    }
    lines
}

/// Merge per-fingerprint series by timestamp; points before `since` are dropped.
pub fn build_series<F>(
    manufacturer: &str,
    model: &str,
    fingerprints: &BTreeSet<FingerprintKey>,
    history_lookup: &F,
    since: Option<DateTime<Utc>>,
) -> TrendSeries
where
    F: Fn(&FingerprintKey) -> Vec<HistoricalPoint>,
{
    let mut points: Vec<HistoricalPoint> = fingerprints
        .iter()
        .flat_map(|fp| history_lookup(fp))
        .filter(|p| since.map_or(true, |cutoff| p.timestamp >= cutoff))
        .collect();
    points.sort_by_key(|p| p.timestamp);

    TrendSeries {
        manufacturer: manufacturer.to_string(),
        model: model.to_string(),
        fingerprints: fingerprints.iter().cloned().collect(),
        daily: daily_rollup(&points),
        points,
    }
}

/// Per-UTC-day means over `points`, oldest day first.
pub fn daily_rollup(points: &[HistoricalPoint]) -> Vec<DailyTrend> {
    let mut days: BTreeMap<NaiveDate, Vec<&HistoricalPoint>> = BTreeMap::new();
    for p in points {
        days.entry(p.timestamp.date_naive()).or_default().push(p);
    }
    days.into_iter()
        .filter_map(|(date, day)| {
            let prices: Vec<Decimal> = day.iter().map(|p| p.price).collect();
            let estimates: Vec<Decimal> = day.iter().map(|p| p.estimated_value).collect();
            let premium_pct =
                day.iter().map(|p| premium(p.price, p.estimated_value) * 100.0).sum::<f64>() / day.len() as f64;
            Some(DailyTrend {
                date,
                points: day.len(),
                mean_price: mean(&prices)?,
                mean_estimate: mean(&estimates)?,
                mean_premium_pct: premium_pct,
            })
        })
        .collect()
}
