pub mod normalize;

use tracing::warn;

use crate::types::{FingerprintKey, FirearmType, RawListing};

pub use normalize::{caliber_spec, canonical_caliber, canonical_manufacturer, canonical_model, CaliberClass};

/// Identity key for a scraped listing. Pure and total: malformed rows map to `UNKNOWN`.
pub fn fingerprint(raw: &RawListing) -> FingerprintKey {
    if raw.is_malformed() {
        warn!(
            event = "MALFORMED_INPUT",
            url = %raw.url,
            manufacturer = %raw.manufacturer,
            model = %raw.model,
            "MALFORMED LISTING | missing manufacturer or model, fingerprinted as UNKNOWN",
        );
        return FingerprintKey::unknown();
    }
    fingerprint_parts(&raw.manufacturer, &raw.model, &raw.caliber)
}

/// Same rules as [`fingerprint`] for loose fields (estimator, history queries).
pub fn fingerprint_parts(manufacturer: &str, model: &str, caliber: &str) -> FingerprintKey {
    let manufacturer = canonical_manufacturer(manufacturer);
    let model = canonical_model(model, &manufacturer);
    if manufacturer.is_empty() || model.is_empty() {
        return FingerprintKey::unknown();
    }
    FingerprintKey::new(manufacturer, model, canonical_caliber(caliber))
}

/// Canonical (manufacturer, model) pair used by the model-line index.
pub fn model_line(manufacturer: &str, model: &str) -> (String, String) {
    let manufacturer = canonical_manufacturer(manufacturer);
    let model = canonical_model(model, &manufacturer);
    (manufacturer, model)
}

/// Page section when it names a platform, otherwise the caliber's typical platform.
pub fn firearm_type(raw: &RawListing) -> FirearmType {
    raw.section
        .as_deref()
        .and_then(FirearmType::from_section)
        .or_else(|| caliber_spec(&raw.caliber).map(|spec| spec.typical_type))
        .unwrap_or(FirearmType::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use crate::types::Condition;

    fn listing(manufacturer: &str, model: &str, caliber: &str) -> RawListing {
        RawListing {
            manufacturer: manufacturer.to_string(),
            model: model.to_string(),
            caliber: caliber.to_string(),
            condition: Condition::UsedGood,
            price: Decimal::from(450),
            url: "/used-guns/1".to_string(),
            scraped_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            section: None,
            description: None,
        }
    }

    #[test]
    fn case_and_caliber_spelling_do_not_split_identity() {
        let a = fingerprint(&listing("Glock", "19", "9mm"));
        let b = fingerprint(&listing("GLOCK", "19", "9 MM"));
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "GLOCK|19|9MM");
    }

    #[test]
    fn manufacturer_alias_merges() {
        let a = fingerprint(&listing("S&W", "686", "357 Magnum"));
        let b = fingerprint(&listing("Smith & Wesson", "686", ".357 mag"));
        assert_eq!(a, b);
        assert_eq!(a.manufacturer(), "SMITH & WESSON");
    }

    #[test]
    fn condition_is_not_part_of_identity() {
        let mut used = listing("Glock", "19", "9mm");
        let mut new = used.clone();
        used.condition = Condition::UsedFair;
        new.condition = Condition::New;
        assert_eq!(fingerprint(&used), fingerprint(&new));
    }

    #[test]
    fn distinct_models_stay_distinct() {
        assert_ne!(
            fingerprint(&listing("Glock", "19", "9mm")),
            fingerprint(&listing("Glock", "19X", "9mm")),
        );
    }

    #[test]
    fn empty_identity_maps_to_unknown() {
        assert!(fingerprint(&listing("", "19", "9mm")).is_unknown());
        assert!(fingerprint(&listing("Glock", "   ", "9mm")).is_unknown());
        // Caliber alone is not identity-critical.
        assert!(!fingerprint(&listing("Glock", "19", "")).is_unknown());
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let raw = listing("Sig", "P365 XL", "9x19");
        assert_eq!(fingerprint(&raw), fingerprint(&raw.clone()));
    }

    #[test]
    fn firearm_type_prefers_section() {
        let mut raw = listing("Ruger", "GP100", "357 mag");
        assert_eq!(firearm_type(&raw), FirearmType::Revolver);
        raw.section = Some("Rifles".to_string());
        assert_eq!(firearm_type(&raw), FirearmType::Rifle);
        raw.caliber = "unobtainium".to_string();
        raw.section = None;
        assert_eq!(firearm_type(&raw), FirearmType::Unknown);
    }
}
