use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

// ---------------------------------------------------------------------------
// Listing condition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum Condition {
    New,
    /// Plain "used" listings land here.
    UsedGood,
    UsedFair,
    #[default]
    Unknown,
}

impl Condition {
    pub fn parse(s: &str) -> Self {
        let folded = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match folded.as_str() {
            "new" | "nib" | "new_in_box" => Condition::New,
            "used" | "used_good" | "good" | "very_good" | "excellent" | "like_new" => {
                Condition::UsedGood
            }
            "used_fair" | "fair" | "poor" | "worn" => Condition::UsedFair,
            _ => Condition::Unknown,
        }
    }
}

impl From<String> for Condition {
    fn from(s: String) -> Self {
        Condition::parse(&s)
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Condition::New => "new",
            Condition::UsedGood => "used_good",
            Condition::UsedFair => "used_fair",
            Condition::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Firearm type (composition breakdowns)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FirearmType {
    Pistol,
    Revolver,
    Rifle,
    Shotgun,
    Unknown,
}

impl FirearmType {
    /// Maps a retailer page section ("Pistols", "Used Rifles", ...) to a type.
    pub fn from_section(section: &str) -> Option<Self> {
        let s = section.to_ascii_lowercase();
        if s.contains("revolver") {
            Some(FirearmType::Revolver)
        } else if s.contains("pistol") || s.contains("handgun") {
            Some(FirearmType::Pistol)
        } else if s.contains("rifle") {
            Some(FirearmType::Rifle)
        } else if s.contains("shotgun") {
            Some(FirearmType::Shotgun)
        } else {
            None
        }
    }

    pub fn parse(s: &str) -> Self {
        Self::from_section(s).unwrap_or(FirearmType::Unknown)
    }
}

impl std::fmt::Display for FirearmType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FirearmType::Pistol => "pistol",
            FirearmType::Revolver => "revolver",
            FirearmType::Rifle => "rifle",
            FirearmType::Shotgun => "shotgun",
            FirearmType::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// RawListing: one scraped row, immutable once produced
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawListing {
    pub manufacturer: String,
    pub model: String,
    pub caliber: String,
    #[serde(default)]
    pub condition: Condition,
    pub price: Decimal,
    /// Listing URL or page-relative identifier. Orders same-fingerprint collisions.
    pub url: String,
    pub scraped_at: DateTime<Utc>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl RawListing {
    /// Empty manufacturer or model: resolves to the UNKNOWN fingerprint.
    pub fn is_malformed(&self) -> bool {
        self.manufacturer.trim().is_empty() || self.model.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// FingerprintKey
// ---------------------------------------------------------------------------

const UNKNOWN_TOKEN: &str = "UNKNOWN";

/// Identity of a model line: normalized (manufacturer, model, caliber).
/// Built by `fingerprint::fingerprint`; fields are already canonical here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct FingerprintKey {
    manufacturer: String,
    model: String,
    caliber: String,
}

impl FingerprintKey {
    pub fn new(manufacturer: impl Into<String>, model: impl Into<String>, caliber: impl Into<String>) -> Self {
        Self {
            manufacturer: manufacturer.into(),
            model: model.into(),
            caliber: caliber.into(),
        }
    }

    /// Sentinel for listings with no usable identity fields.
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_TOKEN, UNKNOWN_TOKEN, UNKNOWN_TOKEN)
    }

    pub fn is_unknown(&self) -> bool {
        self.manufacturer == UNKNOWN_TOKEN && self.model == UNKNOWN_TOKEN && self.caliber == UNKNOWN_TOKEN
    }

    pub fn manufacturer(&self) -> &str {
        &self.manufacturer
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn caliber(&self) -> &str {
        &self.caliber
    }

    pub fn model_line(&self) -> (&str, &str) {
        (&self.manufacturer, &self.model)
    }
}

impl std::fmt::Display for FingerprintKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_unknown() {
            write!(f, "{UNKNOWN_TOKEN}")
        } else {
            write!(f, "{}|{}|{}", self.manufacturer, self.model, self.caliber)
        }
    }
}

impl std::str::FromStr for FingerprintKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == UNKNOWN_TOKEN {
            return Ok(Self::unknown());
        }
        let mut parts = s.splitn(3, '|');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(m), Some(mo), Some(c)) if !m.is_empty() && !mo.is_empty() => Ok(Self::new(m, mo, c)),
            _ => Err(AppError::Decode(format!("malformed fingerprint key: {s:?}"))),
        }
    }
}

impl From<FingerprintKey> for String {
    fn from(key: FingerprintKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for FingerprintKey {
    type Error = AppError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

/// Which rung of the fallback ladder produced an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueSource {
    ExactModelMatch,
    FamilyMatch,
    CaliberFallback,
    GenericFallback,
}

impl ValueSource {
    pub fn confidence(self) -> Confidence {
        match self {
            ValueSource::ExactModelMatch => Confidence::High,
            ValueSource::FamilyMatch => Confidence::Medium,
            ValueSource::CaliberFallback => Confidence::Low,
            ValueSource::GenericFallback => Confidence::Minimal,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "EXACT_MODEL_MATCH" => Some(ValueSource::ExactModelMatch),
            "FAMILY_MATCH" => Some(ValueSource::FamilyMatch),
            "CALIBER_FALLBACK" => Some(ValueSource::CaliberFallback),
            "GENERIC_FALLBACK" => Some(ValueSource::GenericFallback),
            _ => None,
        }
    }
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ValueSource::ExactModelMatch => "EXACT_MODEL_MATCH",
            ValueSource::FamilyMatch => "FAMILY_MATCH",
            ValueSource::CaliberFallback => "CALIBER_FALLBACK",
            ValueSource::GenericFallback => "GENERIC_FALLBACK",
        };
        write!(f, "{s}")
    }
}

/// Ordered lowest to highest, so `Ord` comparisons read naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Minimal,
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Confidence::Minimal => "minimal",
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueEstimate {
    pub estimate: Decimal,
    pub low: Decimal,
    pub high: Decimal,
    /// Fraction of the estimate covered on each side of the range.
    pub width: Decimal,
    pub source: ValueSource,
    pub confidence: Confidence,
}

// ---------------------------------------------------------------------------
// InventoryRecord: persisted projection of the latest sighting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordStatus {
    Active,
    Delisted,
}

impl RecordStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(RecordStatus::Active),
            "DELISTED" => Some(RecordStatus::Delisted),
            _ => None,
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordStatus::Active => write!(f, "ACTIVE"),
            RecordStatus::Delisted => write!(f, "DELISTED"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub fingerprint: FingerprintKey,
    /// Latest raw identity fields, as scraped.
    pub manufacturer: String,
    pub model: String,
    pub caliber: String,
    pub condition: Condition,
    pub firearm_type: FirearmType,
    pub listing_price: Decimal,
    pub listing_url: String,
    pub description: Option<String>,
    pub estimate: ValueEstimate,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub status: RecordStatus,
    pub observation_count: u32,
}

impl InventoryRecord {
    pub fn is_active(&self) -> bool {
        self.status == RecordStatus::Active
    }

    /// Signed `(price - estimate) / estimate`. Negative means priced below market.
    pub fn premium(&self) -> f64 {
        premium(self.listing_price, self.estimate.estimate)
    }
}

/// Signed premium of `price` over `estimate` as a fraction. 0.0 for a non-positive estimate.
pub fn premium(price: Decimal, estimate: Decimal) -> f64 {
    if estimate <= Decimal::ZERO {
        return 0.0;
    }
    ((price - estimate) / estimate).to_f64().unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// HistoricalPoint: append-only price event
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalPoint {
    pub fingerprint: FingerprintKey,
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
    pub estimated_value: Decimal,
}

// ---------------------------------------------------------------------------
// Resolver classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    New,
    Unchanged,
    PriceChanged,
    Relisted,
}

impl Classification {
    /// Whether this classification appends a HistoricalPoint.
    pub fn appends_history(self) -> bool {
        !matches!(self, Classification::Unchanged)
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Classification::New => "NEW",
            Classification::Unchanged => "UNCHANGED",
            Classification::PriceChanged => "PRICE_CHANGED",
            Classification::Relisted => "RELISTED",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_key_text_form_parses_back() {
        let key = FingerprintKey::new("GLOCK", "19", "9MM");
        assert_eq!(key.to_string(), "GLOCK|19|9MM");
        let parsed: FingerprintKey = "GLOCK|19|9MM".parse().unwrap();
        assert_eq!(parsed, key);

        let unknown: FingerprintKey = "UNKNOWN".parse().unwrap();
        assert!(unknown.is_unknown());
        assert!("GLOCK".parse::<FingerprintKey>().is_err());
    }

    #[test]
    fn fingerprint_key_serializes_as_string() {
        let key = FingerprintKey::new("SMITH & WESSON", "686", "357 MAG");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"SMITH & WESSON|686|357 MAG\"");
    }

    #[test]
    fn condition_parses_loosely() {
        assert_eq!(Condition::parse(" New "), Condition::New);
        assert_eq!(Condition::parse("Used"), Condition::UsedGood);
        assert_eq!(Condition::parse("used-fair"), Condition::UsedFair);
        assert_eq!(Condition::parse("refurbished"), Condition::Unknown);
    }

    #[test]
    fn confidence_follows_ladder_order() {
        assert!(ValueSource::ExactModelMatch.confidence() > ValueSource::FamilyMatch.confidence());
        assert!(ValueSource::FamilyMatch.confidence() > ValueSource::CaliberFallback.confidence());
        assert!(ValueSource::CaliberFallback.confidence() > ValueSource::GenericFallback.confidence());
    }

    #[test]
    fn premium_is_signed() {
        assert!(premium(Decimal::from(400), Decimal::from(500)) < 0.0);
        assert!(premium(Decimal::from(600), Decimal::from(500)) > 0.0);
        assert_eq!(premium(Decimal::from(600), Decimal::ZERO), 0.0);
    }
}
