use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::InventoryRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceDistribution {
    pub count: usize,
    pub min: Decimal,
    pub q1: Decimal,
    pub median: Decimal,
    pub q3: Decimal,
    pub max: Decimal,
    pub mean: Decimal,
}

/// Market-wide view of how listings sit against their estimates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSummary {
    pub active_listings: usize,
    pub mean_price: Decimal,
    pub median_price: Decimal,
    pub mean_estimate: Decimal,
    pub median_estimate: Decimal,
    /// Mean of `price - estimate`.
    pub mean_price_difference: Decimal,
    pub mean_premium_pct: f64,
    pub pct_below_estimate: f64,
    pub pct_above_estimate: f64,
    pub pct_at_estimate: f64,
    /// Mean discount (positive percent) over below-estimate listings.
    pub avg_savings_pct: f64,
    /// Mean premium (percent) over above-estimate listings.
    pub avg_premium_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositionEntry {
    pub label: String,
    pub count: usize,
    pub percent: f64,
}

fn round_cents(d: Decimal) -> Decimal {
    d.round_dp(2)
}

pub fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let sum: Decimal = values.iter().copied().sum();
    Some(round_cents(sum / Decimal::from(values.len())))
}

/// Linear interpolation between closest ranks. `sorted` must be ascending and non-empty.
pub fn quantile(sorted: &[Decimal], q: Decimal) -> Decimal {
    let pos = Decimal::from(sorted.len() - 1) * q;
    let lo = pos.floor();
    let idx = lo.to_usize().unwrap_or(0).min(sorted.len() - 1);
    let next = (idx + 1).min(sorted.len() - 1);
    let frac = pos - lo;
    round_cents(sorted[idx] + (sorted[next] - sorted[idx]) * frac)
}

fn median(sorted: &[Decimal]) -> Decimal {
    quantile(sorted, Decimal::new(5, 1))
}

pub fn distribution(prices: &[Decimal]) -> Option<PriceDistribution> {
    if prices.is_empty() {
        return None;
    }
    let mut sorted = prices.to_vec();
    sorted.sort();
    Some(PriceDistribution {
        count: sorted.len(),
        min: sorted[0],
        q1: quantile(&sorted, Decimal::new(25, 2)),
        median: median(&sorted),
        q3: quantile(&sorted, Decimal::new(75, 2)),
        max: sorted[sorted.len() - 1],
        mean: mean(&sorted)?,
    })
}

fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// `active` must contain only ACTIVE records.
pub fn market_summary(active: &[&InventoryRecord]) -> Option<MarketSummary> {
    if active.is_empty() {
        return None;
    }
    let mut prices: Vec<Decimal> = active.iter().map(|r| r.listing_price).collect();
    let mut estimates: Vec<Decimal> = active.iter().map(|r| r.estimate.estimate).collect();
    let diffs: Vec<Decimal> = active.iter().map(|r| r.listing_price - r.estimate.estimate).collect();
    let premiums: Vec<f64> = active.iter().map(|r| r.premium() * 100.0).collect();
    prices.sort();
    estimates.sort();

    let below: Vec<f64> = premiums.iter().copied().filter(|p| *p < 0.0).collect();
    let above: Vec<f64> = premiums.iter().copied().filter(|p| *p > 0.0).collect();
    let at = diffs.iter().filter(|d| d.is_zero()).count();
    let n = active.len();

    Some(MarketSummary {
        active_listings: n,
        mean_price: mean(&prices)?,
        median_price: median(&prices),
        mean_estimate: mean(&estimates)?,
        median_estimate: median(&estimates),
        mean_price_difference: mean(&diffs)?,
        mean_premium_pct: mean_f64(&premiums),
        pct_below_estimate: pct(below.len(), n),
        pct_above_estimate: pct(above.len(), n),
        pct_at_estimate: pct(at, n),
        avg_savings_pct: -mean_f64(&below),
        avg_premium_pct: mean_f64(&above),
    })
}

/// Counts per label, most common first, ties by label.
pub fn composition(labels: impl IntoIterator<Item = String>) -> Vec<CompositionEntry> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut total = 0usize;
    for label in labels {
        *counts.entry(label).or_default() += 1;
        total += 1;
    }
    let mut entries: Vec<CompositionEntry> = counts
        .into_iter()
        .map(|(label, count)| CompositionEntry {
            label,
            count,
            percent: pct(count, total),
        })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    entries
}
