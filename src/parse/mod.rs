// src/parse/mod.rs
pub mod date;

pub use date::year_of;

use anyhow::{anyhow, bail, Context, Result};

/// Marker used by the statistics office exports for "no value".
pub const MISSING_MARKER: &str = "-";

/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].trim()
    } else {
        trimmed
    }
}

/// Parses a forecast cell written in thousands with a decimal comma,
/// e.g. `"593,1"` → `593100`.
///
/// The value goes through `f64` and is truncated, not rounded.
pub fn parse_thousands(raw: &str) -> Result<i64> {
    let s = clean_str(raw);
    if s.is_empty() {
        bail!("empty value where a decimal-comma number was expected");
    }
    if !s
        .chars()
        .all(|c| c.is_ascii_digit() || c == ',')
        || s.matches(',').count() > 1
    {
        bail!("`{}` is not a decimal-comma numeral", s);
    }
    let thousands: f64 = s
        .replace(',', ".")
        .parse()
        .with_context(|| format!("parsing `{}` as decimal-comma numeral", s))?;
    Ok((thousands * 1000.0).trunc() as i64)
}

/// Parses a head count from a history export.
///
/// `thousands_sep` is stripped before parsing. Empty cells and the `-`
/// marker yield `None`.
pub fn parse_locale_count(raw: &str, thousands_sep: Option<char>) -> Result<Option<i64>> {
    let s = clean_str(raw);
    if s.is_empty() || s == MISSING_MARKER {
        return Ok(None);
    }
    let digits: String = s
        .chars()
        .filter(|c| Some(*c) != thousands_sep && !c.is_whitespace())
        .collect();
    digits
        .parse::<i64>()
        .map(Some)
        .map_err(|e| anyhow!("`{}` is not a population count: {}", s, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forecast_cell_scaled_by_thousand() {
        assert_eq!(parse_thousands("593,1").unwrap(), 593100);
        assert_eq!(parse_thousands(" \"612,4\" ").unwrap(), 612400);
        assert_eq!(parse_thousands("600").unwrap(), 600000);
    }

    #[test]
    fn forecast_cell_rejects_garbage() {
        assert!(parse_thousands("").is_err());
        assert!(parse_thousands("abc").is_err());
        assert!(parse_thousands("593.1").is_err());
        assert!(parse_thousands("1,2,3").is_err());
        assert!(parse_thousands("-593,1").is_err());
    }

    #[test]
    fn history_count_handles_separators_and_missing() {
        assert_eq!(parse_locale_count("593.145", Some('.')).unwrap(), Some(593145));
        assert_eq!(parse_locale_count("557 300", None).unwrap(), Some(557300));
        assert_eq!(parse_locale_count("-", Some('.')).unwrap(), None);
        assert_eq!(parse_locale_count("  ", Some('.')).unwrap(), None);
        assert!(parse_locale_count("n/a", Some('.')).is_err());
    }

    #[test]
    fn clean_str_strips_quotes() {
        assert_eq!(clean_str("  \"Leipzig\" "), "Leipzig");
        assert_eq!(clean_str("\""), "\"");
    }
}
