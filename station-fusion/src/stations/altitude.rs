//! Altitude coercion.
//!
//! Upstream altitudes arrive as integers, floats or free text such as
//! `"1200m"` or `"1200,0"`. Coercion never fails: anything that cannot be
//! read as a number is treated as missing.

use super::record::Altitude;

/// Coerce an upstream altitude to whole metres.
///
/// Floats are rounded half away from zero (`1200.5` becomes `1201`).
pub fn coerce_altitude(value: &Altitude) -> Option<i64> {
    match value {
        Altitude::Int(v) => Some(*v),
        Altitude::Float(v) => round_metres(*v),
        Altitude::Text(s) => parse_text(s),
        Altitude::Other(_) => None,
    }
}

fn round_metres(v: f64) -> Option<i64> {
    if !v.is_finite() {
        return None;
    }
    let rounded = v.round();
    // i64::MAX is not exactly representable; stay strictly below 2^63.
    if rounded < i64::MIN as f64 || rounded >= i64::MAX as f64 {
        return None;
    }
    Some(rounded as i64)
}

/// Strip a trailing unit, drop inner spaces and read a decimal comma.
fn parse_text(s: &str) -> Option<i64> {
    let number: String = s
        .trim()
        .trim_end_matches(|c: char| c.is_alphabetic() || c.is_whitespace() || c == '.')
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if number.is_empty() {
        return None;
    }
    round_metres(number.parse().ok()?)
}
