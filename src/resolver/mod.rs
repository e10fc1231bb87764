//! Per-pass identity resolution. `resolve` is pure over its arguments: it reads the
//! stored projection, decides, and returns everything the pass must write. Nothing is
//! persisted here, so a failed commit leaves stored state exactly as it was.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::estimator::estimate_listing;
use crate::fingerprint::{self, fingerprint};
use crate::types::{
    Classification, FingerprintKey, HistoricalPoint, InventoryRecord, RawListing, RecordStatus, ValueEstimate,
};

/// A scraped listing with its identity and valuation attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ValuedListing {
    pub listing: RawListing,
    pub fingerprint: FingerprintKey,
    pub estimate: ValueEstimate,
}

impl ValuedListing {
    pub fn from_raw(listing: RawListing) -> Self {
        Self {
            fingerprint: fingerprint(&listing),
            estimate: estimate_listing(&listing),
            listing,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub fingerprint: FingerprintKey,
    pub classification: Classification,
    pub url: String,
    pub previous_price: Option<Decimal>,
    pub price: Decimal,
}

/// Second and later listings of a pass that share an already-claimed fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Collision {
    pub fingerprint: FingerprintKey,
    pub kept_url: String,
    pub dropped_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PassCounts {
    pub new: usize,
    pub unchanged: usize,
    pub price_changed: usize,
    pub relisted: usize,
    pub delisted: usize,
    pub collisions: usize,
}

/// Everything a pass decided, buffered for a single commit.
#[derive(Debug, Clone, Default)]
pub struct PassOutcome {
    pub decisions: Vec<Decision>,
    /// Upserts: every touched record plus every record moved to DELISTED.
    pub records_to_save: Vec<InventoryRecord>,
    pub history: Vec<HistoricalPoint>,
    pub delisted: Vec<FingerprintKey>,
    pub collisions: Vec<Collision>,
}

impl PassOutcome {
    pub fn counts(&self) -> PassCounts {
        let mut counts = PassCounts {
            delisted: self.delisted.len(),
            collisions: self.collisions.len(),
            ..PassCounts::default()
        };
        for d in &self.decisions {
            match d.classification {
                Classification::New => counts.new += 1,
                Classification::Unchanged => counts.unchanged += 1,
                Classification::PriceChanged => counts.price_changed += 1,
                Classification::Relisted => counts.relisted += 1,
            }
        }
        counts
    }
}

/// Classify one scrape pass against the stored projection (ACTIVE and DELISTED rows).
///
/// Listings are processed in ascending URL order (then lower price, then newest scrape) so
/// that the winner of a fingerprint collision is the same on every replay of the same snapshot.
pub fn resolve(mut snapshot: Vec<ValuedListing>, stored: &HashMap<FingerprintKey, InventoryRecord>) -> PassOutcome {
    snapshot.sort_by(|a, b| {
        a.listing
            .url
            .cmp(&b.listing.url)
            .then_with(|| a.listing.price.cmp(&b.listing.price))
            .then_with(|| b.listing.scraped_at.cmp(&a.listing.scraped_at))
    });

    let mut outcome = PassOutcome::default();
    let mut claimed: HashMap<FingerprintKey, String> = HashMap::with_capacity(snapshot.len());

    for item in snapshot {
        if let Some(kept_url) = claimed.get(&item.fingerprint) {
            warn!(
                event = "FINGERPRINT_COLLISION",
                fingerprint = %item.fingerprint,
                kept_url = %kept_url,
                dropped_url = %item.listing.url,
                "COLLISION | {} | keeping {} over {}",
                item.fingerprint,
                kept_url,
                item.listing.url,
            );
            outcome.collisions.push(Collision {
                fingerprint: item.fingerprint.clone(),
                kept_url: kept_url.clone(),
                dropped_url: item.listing.url.clone(),
            });
            continue;
        }
        claimed.insert(item.fingerprint.clone(), item.listing.url.clone());

        let (record, classification, previous_price) = match stored.get(&item.fingerprint) {
            None => (new_record(&item), Classification::New, None),
            Some(prev) if prev.status == RecordStatus::Delisted => {
                (refreshed(prev, &item), Classification::Relisted, Some(prev.listing_price))
            }
            Some(prev)
                if prev.listing_price == item.listing.price && prev.estimate.estimate == item.estimate.estimate =>
            {
                (observed(prev, &item), Classification::Unchanged, Some(prev.listing_price))
            }
            Some(prev) => {
                if prev.listing_price == item.listing.price {
                    debug!(
                        fingerprint = %item.fingerprint,
                        old_condition = %prev.condition,
                        new_condition = %item.listing.condition,
                        old_estimate = %prev.estimate.estimate,
                        new_estimate = %item.estimate.estimate,
                        "estimate moved with price unchanged",
                    );
                }
                (refreshed(prev, &item), Classification::PriceChanged, Some(prev.listing_price))
            }
        };

        if classification.appends_history() {
            info!(
                event = %classification,
                fingerprint = %item.fingerprint,
                price = %item.listing.price,
                estimate = %item.estimate.estimate,
                "{classification} | {} | ${} (est ${})",
                item.fingerprint,
                item.listing.price,
                item.estimate.estimate,
            );
            outcome.history.push(HistoricalPoint {
                fingerprint: item.fingerprint.clone(),
                timestamp: item.listing.scraped_at,
                price: item.listing.price,
                estimated_value: item.estimate.estimate,
            });
        }

        outcome.decisions.push(Decision {
            fingerprint: item.fingerprint,
            classification,
            url: item.listing.url,
            previous_price,
            price: record.listing_price,
        });
        outcome.records_to_save.push(record);
    }

    let mut untouched: Vec<&InventoryRecord> = stored
        .values()
        .filter(|r| r.is_active() && !claimed.contains_key(&r.fingerprint))
        .collect();
    untouched.sort_by(|a, b| a.fingerprint.cmp(&b.fingerprint));

    for prev in untouched {
        info!(
            event = "DELISTED",
            fingerprint = %prev.fingerprint,
            last_seen = %prev.last_seen,
            "DELISTED | {} | last seen {}",
            prev.fingerprint,
            prev.last_seen,
        );
        let mut record = prev.clone();
        record.status = RecordStatus::Delisted;
        outcome.delisted.push(record.fingerprint.clone());
        outcome.records_to_save.push(record);
    }

    outcome
}

fn new_record(item: &ValuedListing) -> InventoryRecord {
    let l = &item.listing;
    InventoryRecord {
        fingerprint: item.fingerprint.clone(),
        manufacturer: l.manufacturer.clone(),
        model: l.model.clone(),
        caliber: l.caliber.clone(),
        condition: l.condition,
        firearm_type: fingerprint::firearm_type(l),
        listing_price: l.price,
        listing_url: l.url.clone(),
        description: l.description.clone(),
        estimate: item.estimate.clone(),
        first_seen: l.scraped_at,
        last_seen: l.scraped_at,
        status: RecordStatus::Active,
        observation_count: 1,
    }
}

/// Seen again with nothing to report: only the observation bookkeeping moves.
fn observed(prev: &InventoryRecord, item: &ValuedListing) -> InventoryRecord {
    let mut record = prev.clone();
    record.last_seen = prev.last_seen.max(item.listing.scraped_at);
    record.observation_count = prev.observation_count.saturating_add(1);
    record
}

/// Seen again with new price or value, or back from DELISTED.
fn refreshed(prev: &InventoryRecord, item: &ValuedListing) -> InventoryRecord {
    let l = &item.listing;
    let mut record = observed(prev, item);
    record.manufacturer = l.manufacturer.clone();
    record.model = l.model.clone();
    record.caliber = l.caliber.clone();
    record.condition = l.condition;
    record.firearm_type = fingerprint::firearm_type(l);
    record.listing_price = l.price;
    record.listing_url = l.url.clone();
    record.description = l.description.clone();
    record.estimate = item.estimate.clone();
    record.status = RecordStatus::Active;
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use crate::types::Condition;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    fn listing(model: &str, price: i64, url: &str, at: DateTime<Utc>) -> ValuedListing {
        ValuedListing::from_raw(RawListing {
            manufacturer: "Glock".to_string(),
            model: model.to_string(),
            caliber: "9mm".to_string(),
            condition: Condition::UsedGood,
            price: Decimal::from(price),
            url: url.to_string(),
            scraped_at: at,
            section: Some("Pistols".to_string()),
            description: None,
        })
    }

    fn apply(stored: &mut HashMap<FingerprintKey, InventoryRecord>, outcome: &PassOutcome) {
        for r in &outcome.records_to_save {
            stored.insert(r.fingerprint.clone(), r.clone());
        }
    }

    fn key(model: &str) -> FingerprintKey {
        FingerprintKey::new("GLOCK", model, "9MM")
    }

    #[test]
    fn first_sighting_is_new_with_one_point() {
        let out = resolve(vec![listing("19", 450, "/g/1", t0())], &HashMap::new());
        assert_eq!(out.decisions.len(), 1);
        assert_eq!(out.decisions[0].classification, Classification::New);
        assert_eq!(out.history.len(), 1);
        let r = &out.records_to_save[0];
        assert_eq!(r.status, RecordStatus::Active);
        assert_eq!(r.observation_count, 1);
        assert_eq!(r.first_seen, t0());
        assert_eq!(r.firearm_type, crate::types::FirearmType::Pistol);
    }

    #[test]
    fn unchanged_bumps_count_without_history() {
        let mut stored = HashMap::new();
        let seeded = resolve(vec![listing("19", 450, "/g/1", t0())], &stored);
        apply(&mut stored, &seeded);
        let later = t0() + Duration::hours(6);
        let out = resolve(vec![listing("19", 450, "/g/1", later)], &stored);
        assert_eq!(out.decisions[0].classification, Classification::Unchanged);
        assert!(out.history.is_empty());
        let r = &out.records_to_save[0];
        assert_eq!(r.observation_count, 2);
        assert_eq!(r.last_seen, later);
        assert_eq!(r.first_seen, t0());
    }

    #[test]
    fn last_seen_never_moves_backwards() {
        let mut stored = HashMap::new();
        let seeded = resolve(vec![listing("19", 450, "/g/1", t0())], &stored);
        apply(&mut stored, &seeded);
        let out = resolve(vec![listing("19", 450, "/g/1", t0() - Duration::days(1))], &stored);
        assert_eq!(out.records_to_save[0].last_seen, t0());
    }

    #[test]
    fn price_change_appends_point() {
        let mut stored = HashMap::new();
        let seeded = resolve(vec![listing("19", 450, "/g/1", t0())], &stored);
        apply(&mut stored, &seeded);
        let out = resolve(vec![listing("19", 425, "/g/1", t0() + Duration::days(1))], &stored);
        let d = &out.decisions[0];
        assert_eq!(d.classification, Classification::PriceChanged);
        assert_eq!(d.previous_price, Some(Decimal::from(450)));
        assert_eq!(out.history.len(), 1);
        assert_eq!(out.history[0].price, Decimal::from(425));
        assert_eq!(out.records_to_save[0].listing_price, Decimal::from(425));
    }

    #[test]
    fn condition_change_moves_estimate_and_counts_as_price_change() {
        let mut stored = HashMap::new();
        let seeded = resolve(vec![listing("19", 450, "/g/1", t0())], &stored);
        apply(&mut stored, &seeded);
        let mut again = listing("19", 450, "/g/1", t0() + Duration::days(1));
        again.listing.condition = Condition::New;
        again.estimate = estimate_listing(&again.listing);
        let out = resolve(vec![again], &stored);
        assert_eq!(out.decisions[0].classification, Classification::PriceChanged);
        assert_eq!(out.records_to_save[0].condition, Condition::New);
        assert_eq!(out.history.len(), 1);
    }

    #[test]
    fn absent_active_record_is_delisted_without_point() {
        let mut stored = HashMap::new();
        let seeded = resolve(vec![listing("19", 450, "/g/1", t0())], &stored);
        apply(&mut stored, &seeded);
        let out = resolve(vec![], &stored);
        assert!(out.decisions.is_empty());
        assert!(out.history.is_empty());
        assert_eq!(out.delisted, vec![key("19")]);
        let r = &out.records_to_save[0];
        assert_eq!(r.status, RecordStatus::Delisted);
        assert_eq!(r.last_seen, t0());
        assert_eq!(r.observation_count, 1);
    }

    #[test]
    fn delisted_record_comes_back_relisted() {
        let mut stored = HashMap::new();
        let seeded = resolve(vec![listing("19", 450, "/g/1", t0())], &stored);
        apply(&mut stored, &seeded);
        let seeded = resolve(vec![], &stored);
        apply(&mut stored, &seeded);
        // Still DELISTED on a second empty pass, and not re-reported.
        let idle = resolve(vec![], &stored);
        assert!(idle.delisted.is_empty());
        assert!(idle.records_to_save.is_empty());

        let back = t0() + Duration::days(3);
        let out = resolve(vec![listing("19", 440, "/g/2", back)], &stored);
        assert_eq!(out.decisions[0].classification, Classification::Relisted);
        let r = &out.records_to_save[0];
        assert_eq!(r.status, RecordStatus::Active);
        assert_eq!(r.first_seen, t0());
        assert_eq!(r.last_seen, back);
        assert_eq!(r.listing_url, "/g/2");
        assert_eq!(r.observation_count, 2);
        assert_eq!(out.history.len(), 1);
    }

    #[test]
    fn collision_keeps_lowest_url() {
        let snapshot = vec![listing("19", 500, "/g/b", t0()), listing("19", 450, "/g/a", t0())];
        let out = resolve(snapshot.clone(), &HashMap::new());
        assert_eq!(out.decisions.len(), 1);
        assert_eq!(out.decisions[0].url, "/g/a");
        assert_eq!(out.records_to_save[0].listing_price, Decimal::from(450));
        assert_eq!(out.collisions.len(), 1);
        assert_eq!(out.collisions[0].dropped_url, "/g/b");

        let mut reversed = snapshot;
        reversed.reverse();
        assert_eq!(resolve(reversed, &HashMap::new()).decisions, out.decisions);
    }

    #[test]
    fn same_url_collision_is_order_independent() {
        let snapshot = vec![
            listing("19", 500, "/g/1", t0()),
            listing("19", 470, "/g/1", t0()),
            listing("19", 470, "/g/1", t0() + Duration::hours(1)),
        ];
        let out = resolve(snapshot.clone(), &HashMap::new());
        assert_eq!(out.records_to_save[0].listing_price, Decimal::from(470));
        assert_eq!(out.records_to_save[0].last_seen, t0() + Duration::hours(1));
        assert_eq!(out.collisions.len(), 2);

        for rotation in 1..3 {
            let mut shuffled = snapshot.clone();
            shuffled.rotate_left(rotation);
            let again = resolve(shuffled, &HashMap::new());
            assert_eq!(again.records_to_save, out.records_to_save);
            assert_eq!(again.history, out.history);
        }
    }

    #[test]
    fn every_fingerprint_classified_once_and_absent_ones_delisted() {
        let mut stored = HashMap::new();
        let first = vec![
            listing("17", 500, "/g/17", t0()),
            listing("19", 450, "/g/19", t0()),
            listing("26", 480, "/g/26", t0()),
        ];
        let seeded = resolve(first, &stored);
        apply(&mut stored, &seeded);

        let second = vec![
            listing("19", 450, "/g/19", t0() + Duration::days(1)),
            listing("26", 470, "/g/26", t0() + Duration::days(1)),
            listing("43", 400, "/g/43", t0() + Duration::days(1)),
        ];
        let out = resolve(second, &stored);
        let counts = out.counts();
        assert_eq!(counts.new, 1);
        assert_eq!(counts.unchanged, 1);
        assert_eq!(counts.price_changed, 1);
        assert_eq!(counts.delisted, 1);
        assert_eq!(out.delisted, vec![key("17")]);
        assert_eq!(out.history.len(), 2);
    }
}
