//! Derived views over the inventory projection and the price event log.
//! Everything here is a pure function of its arguments.

pub mod deals;
pub mod stats;
pub mod trends;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::TOP_DEALS_LIMIT;
use crate::types::{FingerprintKey, HistoricalPoint, InventoryRecord};

pub use deals::{top_deals, ListingValuation};
pub use stats::{CompositionEntry, MarketSummary, PriceDistribution};
pub use trends::{DailyTrend, TrendSeries};

#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub top_n: usize,
    /// Trend points older than this are left out.
    pub since: Option<DateTime<Utc>>,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            top_n: TOP_DEALS_LIMIT,
            since: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsResult {
    pub active_count: usize,
    pub delisted_count: usize,
    pub price_distribution: Option<PriceDistribution>,
    pub summary: Option<MarketSummary>,
    pub by_type: Vec<CompositionEntry>,
    pub by_caliber: Vec<CompositionEntry>,
    /// ACTIVE listings in fingerprint order.
    pub valuations: Vec<ListingValuation>,
    pub top_deals: Vec<ListingValuation>,
    pub trends: Vec<TrendSeries>,
}

pub fn analyze<F>(snapshot: &[InventoryRecord], history_lookup: F, opts: &AnalyzeOptions) -> AnalyticsResult
where
    F: Fn(&FingerprintKey) -> Vec<HistoricalPoint>,
{
    let mut active: Vec<&InventoryRecord> = snapshot.iter().filter(|r| r.is_active()).collect();
    active.sort_by(|a, b| a.fingerprint.cmp(&b.fingerprint));

    let prices: Vec<_> = active.iter().map(|r| r.listing_price).collect();
    let valuations: Vec<ListingValuation> = active.iter().map(|r| ListingValuation::from_record(r)).collect();

    let by_type = stats::composition(active.iter().map(|r| r.firearm_type.to_string()));
    let by_caliber = stats::composition(active.iter().map(|r| match r.fingerprint.caliber() {
        "" => "UNKNOWN".to_string(),
        caliber => caliber.to_string(),
    }));

    let trends = trends::model_lines(snapshot)
        .iter()
        .map(|((manufacturer, model), fingerprints)| {
            trends::build_series(manufacturer, model, fingerprints, &history_lookup, opts.since)
        })
        .collect();

    AnalyticsResult {
        active_count: active.len(),
        delisted_count: snapshot.len() - active.len(),
        price_distribution: stats::distribution(&prices),
        summary: stats::market_summary(&active),
        by_type,
        by_caliber,
        top_deals: top_deals(&valuations, opts.top_n),
        valuations,
        trends,
    }
}
