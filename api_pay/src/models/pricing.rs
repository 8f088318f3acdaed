use common::env_config::PriceCatalog;

/// Largest amount (in minor units) accepted from a client.
const MAX_MINOR_UNITS: i64 = 1_000_000_000_000;

/// Converts a major-unit amount to minor units, rounding half away from zero
/// on the decimal the client sent.
///
/// The rounding works on the shortest decimal form of `amount` (what a JSON
/// number like `19.995` spells), not on the binary product `amount * 100`,
/// so `19.995 -> 2000`, `1.005 -> 101` and `0.285 -> 29`.
///
/// Returns `None` for non-finite or absurdly large inputs.
pub fn to_minor_units(amount: f64) -> Option<i64> {
    if !amount.is_finite() {
        return None;
    }

    // f64 Display never uses exponent notation
    let text = amount.abs().to_string();
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let whole: i64 = whole.parse().ok()?;

    let mut digits = fraction.bytes().map(|b| i64::from(b - b'0'));
    let mut next = || digits.next().unwrap_or(0);
    let cents = next() * 10 + next();
    let round_up = i64::from(next() >= 5);

    let minor = whole.checked_mul(100)?.checked_add(cents + round_up)?;
    if minor > MAX_MINOR_UNITS {
        return None;
    }
    Some(if amount < 0.0 { -minor } else { minor })
}

/// Renders minor units as a major-unit string without trailing zeros.
pub fn format_major(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    let (whole, cents) = (abs / 100, abs % 100);
    match cents {
        0 => format!("{}{}", sign, whole),
        c if c % 10 == 0 => format!("{}{}.{}", sign, whole, c / 10),
        c => format!("{}{}.{:02}", sign, whole, c),
    }
}

pub fn to_major_units(minor: i64) -> f64 {
    minor as f64 / 100.0
}

/// Server-computed price for one booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub base: i64,
    pub cpr_sign: i64,
    pub total: i64,
    pub include_cpr_sign: bool,
}

impl Quote {
    pub fn from_catalog(catalog: &PriceCatalog, include_cpr_sign: bool) -> Self {
        let cpr_sign = if include_cpr_sign { catalog.cpr_sign } else { 0 };
        Quote {
            base: catalog.base,
            cpr_sign,
            total: catalog.base + cpr_sign,
            include_cpr_sign,
        }
    }
}
