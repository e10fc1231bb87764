pub mod ladder;
pub mod tables;

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use crate::config::{condition_multipliers, MIN_ESTIMATE};
use crate::fingerprint::model_line;
use crate::types::{Condition, RawListing, ValueEstimate};

pub use ladder::{Matcher, Quote};

/// Market value for a listing's categorical fields. Pure and total: every input,
/// including blank ones, produces an estimate with `0 < low <= estimate <= high`.
pub fn estimate(manufacturer: &str, model: &str, caliber: &str, condition: Condition) -> ValueEstimate {
    let quote = if manufacturer.trim().is_empty() || model.trim().is_empty() {
        ladder::generic()
    } else {
        let (manufacturer, model) = model_line(manufacturer, model);
        Matcher::LADDER
            .iter()
            .find_map(|m| m.try_match(&manufacturer, &model, caliber))
            .unwrap_or_else(ladder::generic)
    };

    debug!(
        manufacturer,
        model,
        caliber,
        %condition,
        source = %quote.source,
        base = %quote.base,
        "ESTIMATE | tier selected",
    );

    finalize(quote, condition)
}

pub fn estimate_listing(raw: &RawListing) -> ValueEstimate {
    estimate(&raw.manufacturer, &raw.model, &raw.caliber, raw.condition)
}

pub fn condition_multiplier(condition: Condition) -> Decimal {
    match condition {
        Condition::New => condition_multipliers::NEW,
        Condition::UsedGood | Condition::Unknown => condition_multipliers::USED_GOOD,
        Condition::UsedFair => condition_multipliers::USED_FAIR,
    }
}

fn currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn finalize(quote: Quote, condition: Condition) -> ValueEstimate {
    let estimate = currency((quote.base * condition_multiplier(condition)).max(MIN_ESTIMATE));
    ValueEstimate {
        estimate,
        low: currency(estimate * (Decimal::ONE - quote.width)),
        high: currency(estimate * (Decimal::ONE + quote.width)),
        width: quote.width,
        source: quote.source,
        confidence: quote.source.confidence(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Confidence, ValueSource};

    fn d(v: i64) -> Decimal {
        Decimal::from(v)
    }

    #[test]
    fn exact_model_with_range() {
        let v = estimate("Glock", "19", "9mm", Condition::UsedGood);
        assert_eq!(v.source, ValueSource::ExactModelMatch);
        assert_eq!(v.confidence, Confidence::High);
        assert_eq!(v.estimate, d(560));
        assert_eq!(v.low, d(504));
        assert_eq!(v.high, d(616));
    }

    #[test]
    fn brand_in_model_field_still_matches() {
        let a = estimate("Glock", "Glock 19", "9mm", Condition::UsedGood);
        let b = estimate("GLOCK", "19", "9MM", Condition::UsedGood);
        assert_eq!(a, b);
    }

    #[test]
    fn family_catches_variants() {
        let v = estimate("Glock", "19 Gen5", "9mm", Condition::UsedGood);
        assert_eq!(v.source, ValueSource::FamilyMatch);
        assert_eq!(v.estimate, d(560));
    }

    #[test]
    fn caliber_fallback_when_model_unknown() {
        let v = estimate("Glock", "190", "9mm", Condition::UsedGood);
        assert_eq!(v.source, ValueSource::CaliberFallback);
        assert_eq!(v.estimate, d(475));
        assert_eq!(v.low, Decimal::new(35625, 2));
    }

    #[test]
    fn caliber_fallback_applies_keywords() {
        let v = estimate("Ruger", "Blackhawk Hunter", "44 Magnum", Condition::UsedGood);
        assert_eq!(v.source, ValueSource::CaliberFallback);
        assert_eq!(v.estimate, d(627));
    }

    #[test]
    fn generic_fallback_for_unknown_everything() {
        let v = estimate("Acme", "Boomstick", "unobtainium", Condition::Unknown);
        assert_eq!(v.source, ValueSource::GenericFallback);
        assert_eq!(v.confidence, Confidence::Minimal);
        assert_eq!(v.estimate, d(450));
        assert_eq!(v.low, d(270));
        assert_eq!(v.high, d(630));
    }

    #[test]
    fn malformed_input_is_generic_even_with_caliber() {
        let v = estimate("", "19", "9mm", Condition::UsedGood);
        assert_eq!(v.source, ValueSource::GenericFallback);
        let v = estimate("Glock", "  ", "9mm", Condition::UsedGood);
        assert_eq!(v.source, ValueSource::GenericFallback);
    }

    #[test]
    fn condition_scales_estimate() {
        assert_eq!(estimate("Glock", "19", "9mm", Condition::New).estimate, d(644));
        assert_eq!(estimate("Glock", "19", "9mm", Condition::UsedFair).estimate, d(476));
        assert_eq!(
            estimate("Glock", "19", "9mm", Condition::Unknown),
            estimate("Glock", "19", "9mm", Condition::UsedGood),
        );
    }

    #[test]
    fn floor_keeps_estimate_positive() {
        let quote = Quote { base: d(10), width: Decimal::new(40, 2), source: ValueSource::GenericFallback };
        let v = finalize(quote, Condition::UsedFair);
        assert_eq!(v.estimate, MIN_ESTIMATE);
        assert_eq!(v.low, d(30));
    }

    #[test]
    fn range_invariant_and_determinism_hold() {
        let inputs = [
            ("Glock", "19", "9mm"),
            ("S&W", "M&P Shield Plus", "9mm"),
            ("Sig", "P365 XL", "9x19"),
            ("Colt", "Python", "357"),
            ("Remington", "870 Express Tactical", "12 ga"),
            ("Ruger", "10/22 Takedown", "22lr"),
            ("Henry", "Golden Boy", "22 LR"),
            ("Unknown Maker", "Thing", "45-70"),
            ("", "", ""),
        ];
        let conditions = [Condition::New, Condition::UsedGood, Condition::UsedFair, Condition::Unknown];
        for (mfr, model, cal) in inputs {
            for c in conditions {
                let v = estimate(mfr, model, cal, c);
                assert!(v.estimate > Decimal::ZERO, "{mfr} {model}");
                assert!(v.low <= v.estimate && v.estimate <= v.high, "{mfr} {model}: {v:?}");
                assert_eq!(v, estimate(mfr, model, cal, c));
            }
        }
    }

    #[test]
    fn fallback_tiers_never_gain_confidence() {
        let tiers: Vec<Confidence> = [
            estimate("Glock", "19", "9mm", Condition::UsedGood),
            estimate("Glock", "19 MOS", "9mm", Condition::UsedGood),
            estimate("Glock", "190", "9mm", Condition::UsedGood),
            estimate("Glock", "190", "", Condition::UsedGood),
        ]
        .iter()
        .map(|v| v.confidence)
        .collect();
        assert!(tiers.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(tiers.first(), Some(&Confidence::High));
        assert_eq!(tiers.last(), Some(&Confidence::Minimal));
    }
}
