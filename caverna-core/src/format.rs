//! Formatting helpers shared by the prompt builder and report exports.
//!
//! Numbers are rendered the way the dashboard renders them: pt-BR digit
//! grouping for counts, and JavaScript number formatting for everything that
//! ends up inside the prompt.

use chrono::{DateTime, TimeZone};
use serde::Serializer;

/// Largest integer a JavaScript number represents exactly (2^53 - 1).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Format a count with pt-BR thousands grouping (e.g., `4567` -> "4.567").
pub fn format_integer_pt_br(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

/// Format a number like JavaScript's `String(number)`.
///
/// Whole numbers print without a fractional part (`84.0` -> "84"),
/// fractional numbers use the shortest round-trip form (`84.5` -> "84.5").
pub fn format_js_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER {
        return format!("{}", value as i64);
    }
    format!("{}", value)
}

/// Serialize an `f64` the way `JSON.stringify` does, so whole numbers are
/// written as integers.
pub fn serialize_js_number<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

/// Format a date as pt-BR short date (e.g., "19/10/2026").
pub fn format_date_pt_br<Tz: TimeZone>(ts: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    ts.format("%d/%m/%Y").to_string()
}

/// Mask a secret for display, keeping a short prefix and the last 4 chars.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let prefix: String = chars[..3].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", prefix, suffix)
}
