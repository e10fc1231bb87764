use rust_decimal::Decimal;

use crate::config::{range_widths, GENERIC_ESTIMATE};
use crate::fingerprint::caliber_spec;
use crate::types::ValueSource;

use super::tables::{class_average, FamilyEntry, EXACT_MODELS, FAMILIES, KEYWORD_MULTIPLIERS};

/// Pre-condition price from one rung of the ladder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub base: Decimal,
    pub width: Decimal,
    pub source: ValueSource,
}

/// Valuation strategies, tried in declaration order. The first `Some` wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    ExactModel,
    Family,
    Caliber,
    Generic,
}

impl Matcher {
    pub const LADDER: [Matcher; 4] = [Matcher::ExactModel, Matcher::Family, Matcher::Caliber, Matcher::Generic];

    /// `manufacturer` and `model` must already be canonical (see `fingerprint::model_line`).
    pub fn try_match(self, manufacturer: &str, model: &str, caliber: &str) -> Option<Quote> {
        match self {
            Matcher::ExactModel => EXACT_MODELS
                .iter()
                .find(|e| e.manufacturer == manufacturer && e.model == model)
                .map(|e| Quote {
                    base: Decimal::from(e.base),
                    width: pct(e.width_pct),
                    source: ValueSource::ExactModelMatch,
                }),
            Matcher::Family => {
                let (family, rest) = best_family(manufacturer, model)?;
                let words = words(rest);
                let offset: i64 = family
                    .offsets
                    .iter()
                    .filter(|(token, _)| words.contains(token))
                    .map(|(_, delta)| *delta)
                    .sum();
                Some(Quote {
                    base: Decimal::from(family.base + offset) * keyword_multiplier(model),
                    width: pct(family.width_pct),
                    source: ValueSource::FamilyMatch,
                })
            }
            Matcher::Caliber => {
                let spec = caliber_spec(caliber)?;
                Some(Quote {
                    base: Decimal::from(class_average(spec.class)) * spec.factor * keyword_multiplier(model),
                    width: range_widths::CALIBER_FALLBACK,
                    source: ValueSource::CaliberFallback,
                })
            }
            Matcher::Generic => Some(generic()),
        }
    }
}

pub fn generic() -> Quote {
    Quote {
        base: GENERIC_ESTIMATE,
        width: range_widths::GENERIC_FALLBACK,
        source: ValueSource::GenericFallback,
    }
}

fn pct(p: u32) -> Decimal {
    Decimal::new(i64::from(p), 2)
}

/// Longest family prefix of `model` under `manufacturer`, with the unmatched remainder.
/// A numeric prefix never continues into another digit: "19" covers "19X" but not "190".
fn best_family<'m>(manufacturer: &str, model: &'m str) -> Option<(&'static FamilyEntry, &'m str)> {
    FAMILIES
        .iter()
        .filter(|f| f.manufacturer == manufacturer)
        .filter_map(|f| {
            let rest = model.strip_prefix(f.prefix)?;
            let numeric_tail = f.prefix.ends_with(|c: char| c.is_ascii_digit());
            if numeric_tail && rest.starts_with(|c: char| c.is_ascii_digit()) {
                return None;
            }
            Some((f, rest))
        })
        .min_by_key(|(f, _)| std::cmp::Reverse(f.prefix.len()))
}

fn words(s: &str) -> Vec<&str> {
    s.split(|c: char| c.is_whitespace() || matches!(c, '-' | '/' | ',' | '(' | ')'))
        .filter(|w| !w.is_empty())
        .collect()
}

/// Product of every keyword group that appears as a word in the model name.
fn keyword_multiplier(model: &str) -> Decimal {
    let words = words(model);
    KEYWORD_MULTIPLIERS
        .iter()
        .filter(|(group, _)| group.iter().any(|k| words.contains(k)))
        .fold(Decimal::ONE, |acc, (_, p)| acc * pct(*p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_prefix_respects_digit_boundary() {
        assert!(Matcher::Family.try_match("GLOCK", "19X GEN5", "9MM").is_some());
        assert!(Matcher::Family.try_match("GLOCK", "190", "9MM").is_none());
    }

    #[test]
    fn family_offsets_stack_once_each() {
        let q = Matcher::Family.try_match("GLOCK", "19X GEN5", "9MM").unwrap();
        assert_eq!(q.base, Decimal::from(580));
        assert_eq!(q.source, ValueSource::FamilyMatch);
    }

    #[test]
    fn longest_prefix_wins() {
        let q = Matcher::Family.try_match("SMITH & WESSON", "M&P15 SPORT II", "5.56 NATO").unwrap();
        assert_eq!(q.base, Decimal::from(700));
    }

    #[test]
    fn keyword_groups_multiply() {
        assert_eq!(keyword_multiplier("1911 TARGET"), Decimal::new(120, 2));
        assert_eq!(keyword_multiplier("COMPACT CARRY"), Decimal::new(105, 2));
        assert_eq!(keyword_multiplier("HUNTER COMPETITION"), Decimal::new(125, 2) * Decimal::new(110, 2));
        assert_eq!(keyword_multiplier("TARGETMASTER"), Decimal::ONE);
    }

    #[test]
    fn caliber_needs_a_known_caliber() {
        assert!(Matcher::Caliber.try_match("ACME", "THING", "unobtainium").is_none());
        let q = Matcher::Caliber.try_match("ACME", "THING", "12 ga").unwrap();
        assert_eq!(q.base, Decimal::from(450));
    }
}
