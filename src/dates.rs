//! Relative publication-time resolution.
//!
//! InfoMoney's listing shows publication times as Portuguese relative phrases
//! ("53 minutos atrás", "2 dias atrás"). [`resolve`] turns those into an
//! absolute `%Y-%m-%d %H:%M:%S` timestamp anchored at an explicit `now`, so
//! the conversion stays deterministic under test. Text that matches no known
//! pattern is returned unchanged; downstream validation decides whether an
//! unresolved value is acceptable.

use chrono::{Duration, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Copy)]
enum Unit {
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
}

/// Pattern table, first match wins. The long form of each unit precedes its
/// abbreviation so "53 minutos" never falls through to the bare "m" pattern.
static PATTERNS: Lazy<Vec<(Regex, Unit)>> = Lazy::new(|| {
    [
        (r"(\d+)\s*minutos?\s*atr[áa]s?", Unit::Minutes),
        (r"(\d+)\s*min\s*atr[áa]s?", Unit::Minutes),
        (r"(\d+)\s*horas?\s*atr[áa]s?", Unit::Hours),
        (r"(\d+)\s*h\s*atr[áa]s?", Unit::Hours),
        (r"(\d+)\s*dias?\s*atr[áa]s?", Unit::Days),
        (r"(\d+)\s*d\s*atr[áa]s?", Unit::Days),
        (r"(\d+)\s*semanas?\s*atr[áa]s?", Unit::Weeks),
        (r"(\d+)\s*sem\s*atr[áa]s?", Unit::Weeks),
        (r"(\d+)\s*meses?\s*atr[áa]s?", Unit::Months),
        (r"(\d+)\s*m\s*atr[áa]s?", Unit::Months),
    ]
    .into_iter()
    .map(|(pattern, unit)| (Regex::new(pattern).expect("valid date pattern"), unit))
    .collect()
});

/// Second-precision format shared by resolved dates and store timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Resolve a relative-duration phrase to an absolute timestamp.
///
/// Returns the timestamp formatted to second precision when a pattern
/// matches, or the input unchanged when none does. A month counts as 30 days.
pub fn resolve(text: &str, now: NaiveDateTime) -> String {
    let lowered = text.trim().to_lowercase();

    for (pattern, unit) in PATTERNS.iter() {
        let Some(captures) = pattern.captures(&lowered) else {
            continue;
        };
        let Ok(value) = captures[1].parse::<i64>() else {
            return text.to_string();
        };

        let delta = match unit {
            Unit::Minutes => Duration::minutes(value),
            Unit::Hours => Duration::hours(value),
            Unit::Days => Duration::days(value),
            Unit::Weeks => Duration::weeks(value),
            Unit::Months => Duration::days(value * 30),
        };

        return (now - delta).format(TIMESTAMP_FORMAT).to_string();
    }

    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2025-11-02 15:30:00", TIMESTAMP_FORMAT).unwrap()
    }

    #[test]
    fn resolves_minutes() {
        assert_eq!(resolve("53 minutos atrás", now()), "2025-11-02 14:37:00");
    }

    #[test]
    fn resolves_single_minute() {
        assert_eq!(resolve("1 minuto atrás", now()), "2025-11-02 15:29:00");
    }

    #[test]
    fn resolves_abbreviated_hours() {
        assert_eq!(resolve("3 h atrás", now()), "2025-11-02 12:30:00");
    }

    #[test]
    fn resolves_days() {
        assert_eq!(resolve("2 dias atrás", now()), "2025-10-31 15:30:00");
    }

    #[test]
    fn resolves_weeks() {
        assert_eq!(resolve("1 semana atrás", now()), "2025-10-26 15:30:00");
    }

    #[test]
    fn month_approximates_thirty_days() {
        assert_eq!(resolve("2 meses atrás", now()), "2025-09-03 15:30:00");
    }

    #[test]
    fn bare_m_is_months_not_minutes() {
        // "2 m atrás" must not match the minute patterns.
        assert_eq!(resolve("2 m atrás", now()), "2025-09-03 15:30:00");
    }

    #[test]
    fn tolerates_case_and_surrounding_whitespace() {
        assert_eq!(resolve("  53 Minutos Atrás ", now()), "2025-11-02 14:37:00");
    }

    #[test]
    fn tolerates_missing_accent() {
        assert_eq!(resolve("10 minutos atras", now()), "2025-11-02 15:20:00");
    }

    #[test]
    fn unmatched_text_passes_through() {
        assert_eq!(resolve("ontem à noite", now()), "ontem à noite");
        assert_eq!(resolve("", now()), "");
    }
}
