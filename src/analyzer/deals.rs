use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::{Confidence, FingerprintKey, InventoryRecord, ValueSource};

/// One ACTIVE listing priced against its estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingValuation {
    pub fingerprint: FingerprintKey,
    pub manufacturer: String,
    pub model: String,
    pub caliber: String,
    pub listing_url: String,
    pub listing_price: Decimal,
    pub estimate: Decimal,
    pub low: Decimal,
    pub high: Decimal,
    pub source: ValueSource,
    pub confidence: Confidence,
    /// `price - estimate`
    pub price_difference: Decimal,
    /// Signed fraction; negative = below estimate.
    pub premium: f64,
}

impl ListingValuation {
    pub fn from_record(r: &InventoryRecord) -> Self {
        Self {
            fingerprint: r.fingerprint.clone(),
            manufacturer: r.manufacturer.clone(),
            model: r.model.clone(),
            caliber: r.caliber.clone(),
            listing_url: r.listing_url.clone(),
            listing_price: r.listing_price,
            estimate: r.estimate.estimate,
            low: r.estimate.low,
            high: r.estimate.high,
            source: r.estimate.source,
            confidence: r.estimate.confidence,
            price_difference: r.listing_price - r.estimate.estimate,
            premium: r.premium(),
        }
    }

    pub fn is_deal(&self) -> bool {
        self.premium < 0.0
    }
}

/// Best deal first: most negative premium, then higher confidence, then lower price.
/// Fingerprint last so the order is total.
pub fn deal_order(a: &ListingValuation, b: &ListingValuation) -> Ordering {
    a.premium
        .total_cmp(&b.premium)
        .then_with(|| b.confidence.cmp(&a.confidence))
        .then_with(|| a.listing_price.cmp(&b.listing_price))
        .then_with(|| a.fingerprint.cmp(&b.fingerprint))
}

/// Listings priced below their estimate, best first, at most `limit`.
pub fn top_deals(valuations: &[ListingValuation], limit: usize) -> Vec<ListingValuation> {
    let mut deals: Vec<ListingValuation> = valuations.iter().filter(|v| v.is_deal()).cloned().collect();
    deals.sort_by(deal_order);
    deals.truncate(limit);
    deals
}
