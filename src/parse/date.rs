use anyhow::{bail, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime};

use super::clean_str;

const DATE_FORMATS: &[&str] = &["%d.%m.%Y", "%Y-%m-%d", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &[
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Calendar year of a history timestamp: `2019`, `31.12.2019`,
/// `2019-12-31` or `31.12.2019 00:00`.
pub fn year_of(raw: &str) -> Result<i32> {
    let s = clean_str(raw);
    if s.len() == 4 && s.chars().all(|c| c.is_ascii_digit()) {
        return Ok(s.parse()?);
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d.year());
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.year());
        }
    }
    bail!("cannot read a year from `{}`", s)
}
