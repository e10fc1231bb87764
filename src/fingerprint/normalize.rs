//! Canonicalization tables for manufacturer and caliber tokens.
//!
//! Lookups are case-folded and whitespace-collapsed. Caliber lookups additionally ignore
//! internal spacing and a leading dot, so ".45 ACP", "45ACP" and "45 acp" all resolve to the
//! same entry. Anything not in a table passes through in normalized form.

use std::collections::HashMap;
use std::sync::OnceLock;

use rust_decimal::Decimal;

use crate::types::FirearmType;

const fn d(num: u32, scale: u32) -> Decimal {
    Decimal::from_parts(num, 0, 0, false, scale)
}

// ---------------------------------------------------------------------------
// Token normalization
// ---------------------------------------------------------------------------

/// Trim, upper-case and collapse runs of whitespace. `|` is reserved for fingerprint keys.
pub fn normalize_token(raw: &str) -> String {
    raw.split_whitespace()
        .map(|part| part.to_uppercase().replace('|', "/"))
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Manufacturers
// ---------------------------------------------------------------------------

/// canonical name → aliases seen on retailer pages
const MANUFACTURER_ALIASES: &[(&str, &[&str])] = &[
    ("SMITH & WESSON", &["S&W", "S & W", "SW", "SMITH AND WESSON", "SMITH&WESSON", "SMITH & WESSON INC"]),
    ("SIG SAUER", &["SIG", "SIGSAUER", "SIG-SAUER", "SIG ARMS", "SIGARMS"]),
    ("HECKLER & KOCH", &["HK", "H&K", "H & K", "HECKLER AND KOCH", "HECKLER KOCH"]),
    ("FN HERSTAL", &["FN", "FNH", "FNH USA", "FN AMERICA"]),
    ("SPRINGFIELD ARMORY", &["SPRINGFIELD", "SA"]),
    ("KEL-TEC", &["KELTEC", "KEL TEC"]),
    ("CZ", &["CZ-USA", "CZ USA", "CESKA ZBROJOVKA"]),
    ("RUGER", &["STURM RUGER", "STURM, RUGER", "STURM RUGER & CO"]),
    ("COLT", &["COLT'S", "COLTS", "COLT'S MANUFACTURING"]),
    ("REMINGTON", &["REMINGTON ARMS"]),
    ("WINCHESTER", &["WINCHESTER REPEATING ARMS", "U.S. REPEATING ARMS"]),
    ("MOSSBERG", &["O.F. MOSSBERG", "OF MOSSBERG", "MOSSBERG & SONS"]),
    ("BROWNING", &["BROWNING ARMS"]),
    ("HENRY", &["HENRY REPEATING ARMS", "HENRY ARMS"]),
    ("SAVAGE", &["SAVAGE ARMS"]),
    ("GLOCK", &["GLOCK INC", "GLOCK GMBH"]),
    ("BERETTA", &["BERETTA USA", "PIETRO BERETTA"]),
    ("TAURUS", &["TAURUS INTERNATIONAL"]),
    ("KIMBER", &["KIMBER MFG"]),
    ("MARLIN", &["MARLIN FIREARMS"]),
];

fn manufacturer_index() -> &'static HashMap<String, &'static str> {
    static INDEX: OnceLock<HashMap<String, &'static str>> = OnceLock::new();
    INDEX.get_or_init(|| {
        let mut index = HashMap::new();
        for &(canonical, aliases) in MANUFACTURER_ALIASES {
            index.insert(canonical.to_string(), canonical);
            for alias in aliases {
                index.insert(normalize_token(alias), canonical);
            }
        }
        index
    })
}

/// Canonical manufacturer name, or the normalized input when no alias matches.
pub fn canonical_manufacturer(raw: &str) -> String {
    let token = normalize_token(raw);
    match manufacturer_index().get(&token) {
        Some(canonical) => (*canonical).to_string(),
        None => token,
    }
}

/// Every spelling (canonical + aliases) known for a canonical manufacturer.
fn manufacturer_spellings(canonical: &str) -> Vec<&'static str> {
    MANUFACTURER_ALIASES
        .iter()
        .find(|(name, _)| *name == canonical)
        .map(|(name, aliases)| std::iter::once(*name).chain(aliases.iter().copied()).collect())
        .unwrap_or_default()
}

/// Normalized model with any duplicated brand prefixes removed ("GLOCK 19" under GLOCK → "19").
/// Idempotent: a canonical model maps to itself.
pub fn canonical_model(raw: &str, canonical_manufacturer: &str) -> String {
    let mut token = normalize_token(raw);
    let mut spellings = manufacturer_spellings(canonical_manufacturer);
    if spellings.is_empty() {
        spellings.push(canonical_manufacturer);
    }
    // Longest first so "SMITH & WESSON" wins over "SW".
    spellings.sort_by_key(|s| std::cmp::Reverse(s.len()));
    let prefixes: Vec<String> = spellings
        .into_iter()
        .map(normalize_token)
        .filter(|p| !p.is_empty())
        .collect();

    while let Some(rest) = prefixes.iter().find_map(|prefix| strip_brand(&token, prefix)) {
        token = rest;
    }
    token
}

fn strip_brand(token: &str, prefix: &str) -> Option<String> {
    let rest = token.strip_prefix(prefix)?.strip_prefix(' ')?.trim();
    (!rest.is_empty()).then(|| rest.to_string())
}

// ---------------------------------------------------------------------------
// Calibers
// ---------------------------------------------------------------------------

/// Broad platform a caliber is chambered in. Drives the caliber-fallback price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaliberClass {
    Handgun,
    Rifle,
    Shotgun,
    Rimfire,
}

impl std::fmt::Display for CaliberClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CaliberClass::Handgun => "handgun",
            CaliberClass::Rifle => "rifle",
            CaliberClass::Shotgun => "shotgun",
            CaliberClass::Rimfire => "rimfire",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug)]
pub struct CaliberSpec {
    pub canonical: &'static str,
    pub class: CaliberClass,
    /// Market factor relative to the class average (9MM = 1.00).
    pub factor: Decimal,
    /// Platform most listings in this caliber are, when the page section is missing.
    pub typical_type: FirearmType,
    pub aliases: &'static [&'static str],
}

const CALIBERS: &[CaliberSpec] = &[
    CaliberSpec { canonical: "9MM", class: CaliberClass::Handgun, factor: d(100, 2), typical_type: FirearmType::Pistol,
        aliases: &["9 MM", "9X19", "9X19MM", "9MM LUGER", "9 LUGER", "9MM PARA", "9MM PARABELLUM", "9X19 PARABELLUM"] },
    CaliberSpec { canonical: "45 ACP", class: CaliberClass::Handgun, factor: d(110, 2), typical_type: FirearmType::Pistol,
        aliases: &["45 AUTO", "45ACP", "45 CAL", "45"] },
    CaliberSpec { canonical: "40 S&W", class: CaliberClass::Handgun, factor: d(95, 2), typical_type: FirearmType::Pistol,
        aliases: &["40SW", "40 SW", "40 CAL", "40"] },
    CaliberSpec { canonical: "380 ACP", class: CaliberClass::Handgun, factor: d(90, 2), typical_type: FirearmType::Pistol,
        aliases: &["380", "380 AUTO", "9MM KURZ"] },
    CaliberSpec { canonical: "10MM", class: CaliberClass::Handgun, factor: d(120, 2), typical_type: FirearmType::Pistol,
        aliases: &["10 MM", "10MM AUTO"] },
    CaliberSpec { canonical: "357 MAG", class: CaliberClass::Handgun, factor: d(115, 2), typical_type: FirearmType::Revolver,
        aliases: &["357", "357 MAGNUM"] },
    CaliberSpec { canonical: "38 SPECIAL", class: CaliberClass::Handgun, factor: d(90, 2), typical_type: FirearmType::Revolver,
        aliases: &["38 SPL", "38 SPEC", "38", "38 SPECIAL +P"] },
    CaliberSpec { canonical: "44 MAG", class: CaliberClass::Handgun, factor: d(120, 2), typical_type: FirearmType::Revolver,
        aliases: &["44 MAGNUM", "44 REM MAG"] },
    CaliberSpec { canonical: "22 LR", class: CaliberClass::Rimfire, factor: d(100, 2), typical_type: FirearmType::Rifle,
        aliases: &["22LR", "22 LONG RIFLE", "22 L.R."] },
    CaliberSpec { canonical: "22 WMR", class: CaliberClass::Rimfire, factor: d(110, 2), typical_type: FirearmType::Rifle,
        aliases: &["22 MAG", "22 MAGNUM", "22WMR"] },
    CaliberSpec { canonical: "223 REM", class: CaliberClass::Rifle, factor: d(105, 2), typical_type: FirearmType::Rifle,
        aliases: &["223", "223 REMINGTON"] },
    CaliberSpec { canonical: "5.56 NATO", class: CaliberClass::Rifle, factor: d(105, 2), typical_type: FirearmType::Rifle,
        aliases: &["5.56", "5.56X45", "5.56X45MM", "5.56X45 NATO", "223/5.56", "5.56/223"] },
    CaliberSpec { canonical: "308 WIN", class: CaliberClass::Rifle, factor: d(110, 2), typical_type: FirearmType::Rifle,
        aliases: &["308", "308 WINCHESTER", "7.62X51", "7.62 NATO"] },
    CaliberSpec { canonical: "7.62X39", class: CaliberClass::Rifle, factor: d(100, 2), typical_type: FirearmType::Rifle,
        aliases: &["7.62 X 39", "7.62X39MM"] },
    CaliberSpec { canonical: "6.5 CREEDMOOR", class: CaliberClass::Rifle, factor: d(115, 2), typical_type: FirearmType::Rifle,
        aliases: &["6.5 CM", "6.5CM", "6.5 CREED"] },
    CaliberSpec { canonical: "30-06", class: CaliberClass::Rifle, factor: d(110, 2), typical_type: FirearmType::Rifle,
        aliases: &["30-06 SPRINGFIELD", "30-06 SPRG", "30.06"] },
    CaliberSpec { canonical: "300 WIN MAG", class: CaliberClass::Rifle, factor: d(120, 2), typical_type: FirearmType::Rifle,
        aliases: &["300 WM", "300 WINMAG", "300 WINCHESTER MAGNUM"] },
    CaliberSpec { canonical: "30-30 WIN", class: CaliberClass::Rifle, factor: d(100, 2), typical_type: FirearmType::Rifle,
        aliases: &["30-30", "30 30", "30-30 WINCHESTER"] },
    CaliberSpec { canonical: "45-70 GOVT", class: CaliberClass::Rifle, factor: d(115, 2), typical_type: FirearmType::Rifle,
        aliases: &["45-70", "45/70", "45-70 GOVERNMENT"] },
    CaliberSpec { canonical: "12 GAUGE", class: CaliberClass::Shotgun, factor: d(100, 2), typical_type: FirearmType::Shotgun,
        aliases: &["12 GA", "12GA", "12G", "12 GA."] },
    CaliberSpec { canonical: "20 GAUGE", class: CaliberClass::Shotgun, factor: d(95, 2), typical_type: FirearmType::Shotgun,
        aliases: &["20 GA", "20GA", "20G"] },
    CaliberSpec { canonical: "410 BORE", class: CaliberClass::Shotgun, factor: d(90, 2), typical_type: FirearmType::Shotgun,
        aliases: &["410", "410 GA", "410 GAUGE"] },
];

/// Lookup key: upper-case, no whitespace, no leading dot.
fn caliber_key(raw: &str) -> String {
    let upper: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect();
    upper.trim_start_matches('.').to_string()
}

fn caliber_index() -> &'static HashMap<String, &'static CaliberSpec> {
    static INDEX: OnceLock<HashMap<String, &'static CaliberSpec>> = OnceLock::new();
    INDEX.get_or_init(|| {
        let mut index = HashMap::new();
        for spec in CALIBERS {
            index.insert(caliber_key(spec.canonical), spec);
            for alias in spec.aliases {
                index.entry(caliber_key(alias)).or_insert(spec);
            }
        }
        index
    })
}

/// Table entry for any spelling of a known caliber.
pub fn caliber_spec(raw: &str) -> Option<&'static CaliberSpec> {
    caliber_index().get(&caliber_key(raw)).copied()
}

/// Canonical caliber token, or the normalized input (leading dot dropped) when unknown.
pub fn canonical_caliber(raw: &str) -> String {
    match caliber_spec(raw) {
        Some(spec) => spec.canonical.to_string(),
        None => normalize_token(raw.trim().trim_start_matches('.')),
    }
}
