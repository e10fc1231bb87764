use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::config::{field_limits, price_sanity};
use crate::error::{AppError, Result};
use crate::types::{Condition, RawListing};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestStats {
    pub rows_total: usize,
    pub accepted: usize,
    pub rejected_not_object: usize,
    pub rejected_missing_price: usize,
    pub rejected_bad_price: usize,
    pub rejected_negative_price: usize,
    /// Manufacturer, model, caliber or URL longer than `field_limits` allows.
    pub rejected_oversized_field: usize,
    /// Accepted, but description or section was cut to `field_limits`.
    pub truncated_text: usize,
    /// Accepted, but outside `price_sanity` bounds.
    pub suspicious_price: usize,
    /// Sample of unparseable price values, for the pass log.
    pub bad_price_samples: Vec<String>,
}

impl IngestStats {
    pub fn rejected(&self) -> usize {
        self.rejected_not_object
            + self.rejected_missing_price
            + self.rejected_bad_price
            + self.rejected_negative_price
            + self.rejected_oversized_field
    }
}

enum Rejection {
    NotObject,
    MissingPrice,
    BadPrice(String),
    NegativePrice,
    Oversized { field: &'static str, len: usize },
}

/// Read and parse a scraper snapshot file. Rows without their own `scraped_at` are stamped
/// with the file's modification time, so replaying the same file is reproducible.
pub async fn read_snapshot(path: &Path) -> Result<(Vec<RawListing>, IngestStats)> {
    let text = tokio::fs::read_to_string(path).await?;
    let modified: DateTime<Utc> = tokio::fs::metadata(path).await?.modified()?.into();
    parse_snapshot(&text, modified)
}

/// Parse a snapshot: either a bare JSON array of listing objects, or
/// `{"scraped_at": ..., "listings": [...]}`. Bad rows are counted and skipped.
pub fn parse_snapshot(text: &str, default_scraped_at: DateTime<Utc>) -> Result<(Vec<RawListing>, IngestStats)> {
    let doc: serde_json::Value = serde_json::from_str(text)?;

    let (items, scraped_at) = match &doc {
        serde_json::Value::Array(items) => (items, default_scraped_at),
        serde_json::Value::Object(obj) => {
            let items = obj
                .get("listings")
                .and_then(|l| l.as_array())
                .ok_or_else(|| AppError::Decode("snapshot object has no \"listings\" array".to_string()))?;
            let at = obj.get("scraped_at").and_then(parse_timestamp).unwrap_or(default_scraped_at);
            (items, at)
        }
        _ => return Err(AppError::Decode("snapshot is neither an array nor an object".to_string())),
    };

    let mut listings = Vec::with_capacity(items.len());
    let mut stats = IngestStats {
        rows_total: items.len(),
        ..IngestStats::default()
    };

    for (idx, item) in items.iter().enumerate() {
        match parse_listing(item, idx, scraped_at) {
            Ok((listing, truncated)) => {
                if truncated {
                    stats.truncated_text += 1;
                    debug!(url = %listing.url, "free text truncated to field limits");
                }
                if listing.price < price_sanity::MIN || listing.price > price_sanity::MAX {
                    stats.suspicious_price += 1;
                    warn!(
                        event = "SUSPICIOUS_PRICE",
                        url = %listing.url,
                        price = %listing.price,
                        "SUSPICIOUS PRICE | {} {} at ${} is outside sane bounds",
                        listing.manufacturer,
                        listing.model,
                        listing.price,
                    );
                }
                listings.push(listing);
            }
            Err(rejection) => match rejection {
                Rejection::NotObject => stats.rejected_not_object += 1,
                Rejection::MissingPrice => stats.rejected_missing_price += 1,
                Rejection::BadPrice(raw) => {
                    stats.rejected_bad_price += 1;
                    if stats.bad_price_samples.len() < 10 {
                        stats.bad_price_samples.push(raw);
                    }
                }
                Rejection::NegativePrice => stats.rejected_negative_price += 1,
                Rejection::Oversized { field, len } => {
                    stats.rejected_oversized_field += 1;
                    warn!(
                        event = "OVERSIZED_FIELD",
                        row = idx,
                        field,
                        len,
                        "OVERSIZED FIELD | row {idx} rejected: {field} is {len} chars",
                    );
                }
            },
        }
    }

    stats.accepted = listings.len();
    debug!(total = stats.rows_total, accepted = stats.accepted, rejected = stats.rejected(), "snapshot parsed");
    Ok((listings, stats))
}

fn parse_listing(
    v: &serde_json::Value,
    idx: usize,
    default_scraped_at: DateTime<Utc>,
) -> std::result::Result<(RawListing, bool), Rejection> {
    if !v.is_object() {
        return Err(Rejection::NotObject);
    }

    let price = match v.get("price") {
        None | Some(serde_json::Value::Null) => return Err(Rejection::MissingPrice),
        Some(p) => parse_price(p).ok_or_else(|| Rejection::BadPrice(p.to_string()))?,
    };
    if price < Decimal::ZERO {
        return Err(Rejection::NegativePrice);
    }

    let text = |key: &str| v.get(key).and_then(|s| s.as_str()).unwrap_or("").trim().to_string();
    let optional = |key: &str| {
        v.get(key)
            .and_then(|s| s.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };

    // Page-relative fallback keeps the collision tie-break deterministic for url-less rows.
    let url = optional("url")
        .or_else(|| optional("link"))
        .unwrap_or_else(|| format!("#row-{idx:06}"));

    let manufacturer = bounded("manufacturer", text("manufacturer"), field_limits::MANUFACTURER)?;
    let model = bounded("model", text("model"), field_limits::MODEL)?;
    let caliber = bounded("caliber", text("caliber"), field_limits::CALIBER)?;
    let url = bounded("url", url, field_limits::URL)?;

    let mut truncated = false;
    let mut clip = |s: String, max: usize| {
        let (s, cut) = truncate_chars(s, max);
        truncated |= cut;
        s
    };
    let section = optional("section").map(|s| clip(s, field_limits::SECTION));
    let description = optional("description").map(|s| clip(s, field_limits::DESCRIPTION));

    let listing = RawListing {
        manufacturer,
        model,
        caliber,
        condition: Condition::parse(&text("condition")),
        price,
        url,
        scraped_at: v.get("scraped_at").and_then(parse_timestamp).unwrap_or(default_scraped_at),
        section,
        description,
    };
    Ok((listing, truncated))
}

fn bounded(field: &'static str, value: String, max: usize) -> std::result::Result<String, Rejection> {
    let len = value.chars().count();
    if len > max {
        return Err(Rejection::Oversized { field, len });
    }
    Ok(value)
}

/// Cut to at most `max` chars on a char boundary. The flag reports whether anything was cut.
fn truncate_chars(s: String, max: usize) -> (String, bool) {
    match s.char_indices().nth(max) {
        Some((byte_idx, _)) => (s[..byte_idx].trim_end().to_string(), true),
        None => (s, false),
    }
}

/// Number, or a display string like "$1,234.50" / "1234 USD". Rounded to cents.
pub fn parse_price(v: &serde_json::Value) -> Option<Decimal> {
    let raw = match v {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s
            .trim()
            .trim_end_matches("USD")
            .chars()
            .filter(|c| !matches!(c, '$' | ',' | ' '))
            .collect(),
        _ => return None,
    };
    if raw.is_empty() {
        return None;
    }
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .ok()
        .map(|d| d.round_dp(2))
}

fn parse_timestamp(v: &serde_json::Value) -> Option<DateTime<Utc>> {
    let s = v.as_str()?;
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn parses_number_and_display_prices() {
        assert_eq!(parse_price(&serde_json::json!(450)), Some(Decimal::from(450)));
        assert_eq!(parse_price(&serde_json::json!("$1,234.50")), Some(Decimal::new(123450, 2)));
        assert_eq!(parse_price(&serde_json::json!("399 USD")), Some(Decimal::from(399)));
        assert_eq!(parse_price(&serde_json::json!("call for price")), None);
        assert_eq!(parse_price(&serde_json::json!(true)), None);
    }

    #[test]
    fn counts_rejections_without_failing() {
        let text = r#"[
            {"manufacturer": "Glock", "model": "19", "caliber": "9mm", "price": "$450", "url": "/g/1", "section": "Pistols"},
            {"manufacturer": "Glock", "model": "17", "caliber": "9mm", "url": "/g/2"},
            {"manufacturer": "Ruger", "model": "LCP", "caliber": "380", "price": "ask", "url": "/r/1"},
            {"manufacturer": "Ruger", "model": "LCR", "caliber": "38", "price": -5, "url": "/r/2"},
            "not a row",
            {"manufacturer": "", "model": "", "caliber": "", "price": 200}
        ]"#;
        let (listings, stats) = parse_snapshot(text, at()).unwrap();
        assert_eq!(stats.rows_total, 6);
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.rejected_missing_price, 1);
        assert_eq!(stats.rejected_bad_price, 1);
        assert_eq!(stats.rejected_negative_price, 1);
        assert_eq!(stats.rejected_not_object, 1);
        assert_eq!(stats.bad_price_samples, vec!["\"ask\"".to_string()]);

        assert_eq!(listings[0].price, Decimal::from(450));
        assert_eq!(listings[0].scraped_at, at());
        assert_eq!(listings[0].section.as_deref(), Some("Pistols"));
        // Malformed identity is kept; it fingerprints to UNKNOWN downstream.
        assert!(listings[1].is_malformed());
        assert_eq!(listings[1].url, "#row-000005");
    }

    #[test]
    fn object_form_carries_pass_timestamp() {
        let text = r#"{"scraped_at": "2024-04-02T10:00:00Z",
                      "listings": [{"manufacturer": "Colt", "model": "Python", "caliber": "357", "price": 1800, "condition": "New", "url": "/c/1"}]}"#;
        let (listings, _) = parse_snapshot(text, at()).unwrap();
        assert_eq!(listings[0].scraped_at, Utc.with_ymd_and_hms(2024, 4, 2, 10, 0, 0).unwrap());
        assert_eq!(listings[0].condition, Condition::New);
    }

    #[test]
    fn oversized_identity_rejects_and_long_text_truncates() {
        let rows = serde_json::json!([
            {"manufacturer": "M".repeat(51), "model": "19", "caliber": "9mm", "price": 400, "url": "/a"},
            {"manufacturer": "Glock", "model": "19", "caliber": "9".repeat(31), "price": 400, "url": "/b"},
            {"manufacturer": "Glock", "model": "19", "caliber": "9mm", "price": 400,
             "url": format!("/{}", "u".repeat(2048))},
            {"manufacturer": "Glock", "model": "X".repeat(50), "caliber": "9mm", "price": 400, "url": "/c",
             "description": "é".repeat(600), "section": "Used Pistols"}
        ]);
        let (listings, stats) = parse_snapshot(&rows.to_string(), at()).unwrap();
        assert_eq!(stats.rejected_oversized_field, 3);
        assert_eq!(stats.rejected(), 3);
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.truncated_text, 1);

        let kept = &listings[0];
        assert_eq!(kept.model.chars().count(), 50);
        assert_eq!(kept.description.as_deref().map(|d| d.chars().count()), Some(500));
        assert_eq!(kept.section.as_deref(), Some("Used Pistols"));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("ab€cd".to_string(), 3), ("ab€".to_string(), true));
        assert_eq!(truncate_chars("short".to_string(), 10), ("short".to_string(), false));
    }

    #[test]
    fn rejects_non_snapshot_documents() {
        assert!(parse_snapshot("42", at()).is_err());
        assert!(parse_snapshot("{\"rows\": []}", at()).is_err());
        assert!(parse_snapshot("not json", at()).is_err());
    }
}
