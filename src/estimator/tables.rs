//! Static market tables. Prices are whole dollars for used-good condition; widths are
//! percent of the estimate on each side of the range.

use crate::fingerprint::CaliberClass;

pub struct ModelEntry {
    pub manufacturer: &'static str,
    pub model: &'static str,
    pub base: i64,
    pub width_pct: u32,
}

pub struct FamilyEntry {
    pub manufacturer: &'static str,
    pub prefix: &'static str,
    pub base: i64,
    pub width_pct: u32,
    /// Suffix word → dollar offset ("GEN5" +40 on the GLOCK 19 family).
    pub offsets: &'static [(&'static str, i64)],
}

const fn m(manufacturer: &'static str, model: &'static str, base: i64, width_pct: u32) -> ModelEntry {
    ModelEntry { manufacturer, model, base, width_pct }
}

const fn f(
    manufacturer: &'static str,
    prefix: &'static str,
    base: i64,
    width_pct: u32,
    offsets: &'static [(&'static str, i64)],
) -> FamilyEntry {
    FamilyEntry { manufacturer, prefix, base, width_pct, offsets }
}

pub const EXACT_MODELS: &[ModelEntry] = &[
    m("GLOCK", "17", 540, 10),
    m("GLOCK", "19", 560, 10),
    m("GLOCK", "19X", 580, 10),
    m("GLOCK", "26", 530, 10),
    m("GLOCK", "43", 470, 10),
    m("GLOCK", "43X", 490, 10),
    m("GLOCK", "48", 490, 10),
    m("SIG SAUER", "P365", 560, 10),
    m("SIG SAUER", "P365 XL", 620, 10),
    m("SIG SAUER", "P320", 590, 12),
    m("SIG SAUER", "P226", 920, 12),
    m("SMITH & WESSON", "686", 850, 15),
    m("SMITH & WESSON", "629", 950, 15),
    m("SMITH & WESSON", "M&P9", 450, 10),
    m("SMITH & WESSON", "M&P SHIELD", 400, 10),
    m("SMITH & WESSON", "SHIELD", 400, 10),
    m("RUGER", "10/22", 300, 12),
    m("RUGER", "GP100", 700, 12),
    m("RUGER", "SP101", 640, 12),
    m("RUGER", "MINI-14", 1000, 15),
    m("RUGER", "LCP", 250, 10),
    m("COLT", "PYTHON", 1800, 20),
    m("COLT", "1911", 1000, 15),
    m("REMINGTON", "870", 450, 12),
    m("REMINGTON", "700", 650, 15),
    m("MOSSBERG", "500", 400, 12),
    m("MOSSBERG", "590", 500, 12),
    m("BERETTA", "92FS", 620, 12),
    m("SPRINGFIELD ARMORY", "HELLCAT", 525, 10),
    m("HECKLER & KOCH", "VP9", 650, 12),
    m("CZ", "75B", 650, 12),
    m("TAURUS", "G2C", 230, 10),
    m("HENRY", "GOLDEN BOY", 550, 12),
    m("BROWNING", "HI-POWER", 1100, 20),
    m("WINCHESTER", "MODEL 70", 850, 15),
    m("MARLIN", "336", 600, 15),
    m("TIKKA", "T3X", 800, 12),
];

pub const FAMILIES: &[FamilyEntry] = &[
    f("GLOCK", "17", 500, 15, &[("GEN5", 40), ("GEN4", 10), ("GEN3", -30), ("MOS", 60), ("L", 80)]),
    f("GLOCK", "19", 520, 15, &[("X", 20), ("GEN5", 40), ("GEN4", 10), ("GEN3", -30), ("MOS", 60)]),
    f("GLOCK", "20", 560, 15, &[("GEN5", 40), ("SF", 10)]),
    f("GLOCK", "21", 520, 15, &[("GEN5", 40), ("SF", 10)]),
    f("GLOCK", "22", 470, 15, &[("GEN5", 40), ("GEN3", -30)]),
    f("GLOCK", "23", 470, 15, &[("GEN5", 40), ("GEN3", -30)]),
    f("GLOCK", "26", 500, 15, &[("GEN5", 40), ("GEN3", -30)]),
    f("GLOCK", "43", 440, 15, &[("X", 30), ("MOS", 50)]),
    f("GLOCK", "45", 520, 15, &[("MOS", 50)]),
    f("GLOCK", "48", 460, 15, &[("MOS", 40)]),
    f("SIG SAUER", "P365", 530, 15, &[("XL", 60), ("X", 30), ("MACRO", 120), ("SAS", 20)]),
    f("SIG SAUER", "P320", 560, 15, &[("X5", 250), ("XCARRY", 120), ("XFIVE", 250)]),
    f("SIG SAUER", "P226", 880, 15, &[("LEGION", 350), ("MK25", 150)]),
    f("SIG SAUER", "P229", 860, 15, &[("LEGION", 350)]),
    f("SIG SAUER", "P938", 560, 15, &[]),
    f("SMITH & WESSON", "M&P15", 750, 18, &[("SPORT", -50)]),
    f("SMITH & WESSON", "M&P", 430, 15, &[("SHIELD", -50), ("PLUS", 40), ("2.0", 40), ("M2.0", 40)]),
    f("SMITH & WESSON", "SHIELD", 400, 15, &[("PLUS", 50), ("EZ", -20)]),
    f("SMITH & WESSON", "SD", 280, 15, &[("VE", 0)]),
    f("SMITH & WESSON", "686", 800, 18, &[("PLUS", 60)]),
    f("SMITH & WESSON", "629", 900, 18, &[]),
    f("SMITH & WESSON", "642", 450, 15, &[]),
    f("RUGER", "10/22", 280, 15, &[("TAKEDOWN", 60), ("CARBINE", 0)]),
    f("RUGER", "MINI-14", 950, 18, &[("RANCH", 50)]),
    f("RUGER", "MINI 14", 950, 18, &[("RANCH", 50)]),
    f("RUGER", "GP100", 680, 15, &[]),
    f("RUGER", "SP101", 620, 15, &[]),
    f("RUGER", "LCP", 230, 15, &[("MAX", 70), ("II", 20)]),
    f("RUGER", "LCR", 450, 15, &[]),
    f("RUGER", "SECURITY-9", 280, 15, &[]),
    f("RUGER", "MARK", 420, 15, &[("IV", 40), ("III", 0)]),
    f("RUGER", "AMERICAN", 450, 18, &[("PREDATOR", 50)]),
    f("COLT", "PYTHON", 1650, 25, &[]),
    f("COLT", "1911", 950, 20, &[]),
    f("COLT", "GOVERNMENT", 1000, 20, &[]),
    f("COLT", "DETECTIVE SPECIAL", 900, 25, &[]),
    f("COLT", "AR-15", 1100, 20, &[]),
    f("REMINGTON", "870", 420, 15, &[("EXPRESS", -60), ("WINGMASTER", 150)]),
    f("REMINGTON", "700", 650, 18, &[("BDL", 100), ("SPS", 0), ("CDL", 150)]),
    f("REMINGTON", "1100", 550, 18, &[]),
    f("REMINGTON", "11-87", 600, 18, &[]),
    f("MOSSBERG", "500", 380, 15, &[]),
    f("MOSSBERG", "590", 480, 15, &[("A1", 150)]),
    f("MOSSBERG", "835", 420, 15, &[]),
    f("MOSSBERG", "PATRIOT", 400, 18, &[]),
    f("BERETTA", "92", 600, 15, &[("FS", 20), ("X", 150), ("A1", 100)]),
    f("BERETTA", "PX4", 520, 15, &[]),
    f("BERETTA", "APX", 380, 15, &[]),
    f("BERETTA", "A300", 700, 18, &[]),
    f("BERETTA", "1301", 1200, 18, &[]),
    f("SPRINGFIELD ARMORY", "XD", 420, 15, &[("M", 80), ("MOD.2", 40), ("S", 0)]),
    f("SPRINGFIELD ARMORY", "HELLCAT", 500, 15, &[("PRO", 50), ("OSP", 30)]),
    f("SPRINGFIELD ARMORY", "1911", 850, 20, &[]),
    f("SPRINGFIELD ARMORY", "M1A", 1600, 20, &[]),
    f("SPRINGFIELD ARMORY", "SAINT", 950, 18, &[]),
    f("TAURUS", "G2", 220, 15, &[]),
    f("TAURUS", "G3", 260, 15, &[]),
    f("TAURUS", "PT", 230, 18, &[]),
    f("TAURUS", "JUDGE", 420, 18, &[]),
    f("HENRY", "GOLDEN BOY", 520, 15, &[]),
    f("HENRY", "BIG BOY", 850, 15, &[]),
    f("HENRY", "H001", 350, 15, &[]),
    f("BROWNING", "HI-POWER", 1050, 25, &[]),
    f("BROWNING", "BUCK MARK", 450, 18, &[]),
    f("BROWNING", "X-BOLT", 950, 18, &[]),
    f("BROWNING", "A5", 1300, 20, &[]),
    f("BROWNING", "CITORI", 1800, 25, &[]),
    f("BROWNING", "BPS", 600, 18, &[]),
    f("HECKLER & KOCH", "VP9", 620, 15, &[("SK", 0), ("OR", 40)]),
    f("HECKLER & KOCH", "VP40", 600, 15, &[]),
    f("HECKLER & KOCH", "P30", 720, 15, &[("L", 40), ("SK", 0)]),
    f("HECKLER & KOCH", "USP", 800, 18, &[("COMPACT", 0), ("TACTICAL", 150)]),
    f("HECKLER & KOCH", "P2000", 650, 15, &[]),
    f("FN HERSTAL", "509", 600, 15, &[("TACTICAL", 150)]),
    f("FN HERSTAL", "FIVE-SEVEN", 1150, 15, &[]),
    f("FN HERSTAL", "FNX", 600, 15, &[]),
    f("FN HERSTAL", "SCAR", 3200, 20, &[]),
    f("FN HERSTAL", "PS90", 1900, 20, &[]),
    f("CZ", "75", 620, 15, &[("D", 30), ("SP-01", 150), ("COMPACT", 0)]),
    f("CZ", "P-10", 450, 15, &[]),
    f("CZ", "P10", 450, 15, &[]),
    f("CZ", "SHADOW", 1150, 20, &[]),
    f("CZ", "457", 500, 18, &[]),
    f("CZ", "SCORPION", 850, 18, &[]),
    f("KIMBER", "MICRO", 600, 18, &[]),
    f("KIMBER", "K6S", 850, 18, &[]),
    f("KIMBER", "CUSTOM", 850, 20, &[]),
    f("KEL-TEC", "PMR-30", 400, 18, &[]),
    f("KEL-TEC", "SUB-2000", 420, 18, &[]),
    f("KEL-TEC", "P3AT", 220, 15, &[]),
    f("KEL-TEC", "KSG", 800, 18, &[]),
    f("TIKKA", "T3", 750, 15, &[]),
    f("MARLIN", "336", 580, 18, &[]),
    f("MARLIN", "1895", 900, 20, &[]),
    f("MARLIN", "60", 220, 15, &[]),
    f("SAVAGE", "AXIS", 360, 15, &[("II", 40)]),
    f("SAVAGE", "110", 600, 18, &[]),
    f("SAVAGE", "93", 280, 15, &[]),
    f("WINCHESTER", "MODEL 70", 820, 18, &[]),
    f("WINCHESTER", "70", 820, 18, &[]),
    f("WINCHESTER", "MODEL 94", 650, 20, &[]),
    f("WINCHESTER", "94", 650, 20, &[]),
    f("WINCHESTER", "SXP", 350, 15, &[]),
    f("STOEGER", "M3000", 550, 15, &[]),
    f("STOEGER", "COACH GUN", 450, 15, &[]),
];

/// Average used-good price of a platform when only the caliber is known.
pub fn class_average(class: CaliberClass) -> i64 {
    match class {
        CaliberClass::Handgun => 475,
        CaliberClass::Rifle => 750,
        CaliberClass::Shotgun => 450,
        CaliberClass::Rimfire => 325,
    }
}

/// Model-name keywords that move value. Each group applies at most once.
pub const KEYWORD_MULTIPLIERS: &[(&[&str], u32)] = &[
    (&["CUSTOM", "TACTICAL", "PREMIUM", "ELITE", "TARGET"], 120),
    (&["COMPACT", "CARRY"], 105),
    (&["COMPETITION"], 125),
    (&["HUNTER"], 110),
];
