// src/record.rs
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Note marking the newest observed total, the boundary between real and planned data.
pub const NOTE_LAST_EMISSIONS: &str = "last_emissions";
/// Note marking the newest historic population entry.
pub const NOTE_LATEST: &str = "latest";

/// Emission source categories plus the population marker.
///
/// Revisions disagree on the household label, so both spellings are kept
/// as distinct variants instead of being normalised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Gesamt")]
    Gesamt,
    #[serde(rename = "Wirtschaft")]
    Wirtschaft,
    #[serde(rename = "Private Haushalte")]
    PrivateHaushalte,
    #[serde(rename = "Haushalte")]
    Haushalte,
    #[serde(rename = "Verkehr")]
    Verkehr,
    #[serde(rename = "Kommunale Einrichtungen")]
    KommunaleEinrichtungen,
    #[serde(rename = "Einwohner")]
    Einwohner,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Gesamt => "Gesamt",
            Category::Wirtschaft => "Wirtschaft",
            Category::PrivateHaushalte => "Private Haushalte",
            Category::Haushalte => "Haushalte",
            Category::Verkehr => "Verkehr",
            Category::KommunaleEinrichtungen => "Kommunale Einrichtungen",
            Category::Einwohner => "Einwohner",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "Gesamt" => Some(Category::Gesamt),
            "Wirtschaft" => Some(Category::Wirtschaft),
            "Private Haushalte" => Some(Category::PrivateHaushalte),
            "Haushalte" => Some(Category::Haushalte),
            "Verkehr" => Some(Category::Verkehr),
            "Kommunale Einrichtungen" => Some(Category::KommunaleEinrichtungen),
            "Einwohner" => Some(Category::Einwohner),
            _ => None,
        }
    }

    /// True for the categories whose values add up to `Gesamt`.
    pub fn is_part(&self) -> bool {
        !matches!(self, Category::Gesamt | Category::Einwohner)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed vs. planned vs. population marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordType {
    #[serde(rename = "real")]
    Real,
    #[serde(rename = "geplant")]
    Geplant,
    #[serde(rename = "Einwohner")]
    Einwohner,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Real => "real",
            RecordType::Geplant => "geplant",
            RecordType::Einwohner => "Einwohner",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "real" => Some(RecordType::Real),
            "geplant" => Some(RecordType::Geplant),
            "Einwohner" => Some(RecordType::Einwohner),
            _ => None,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the long-format output table.
///
/// `value` is kilotons of CO2 for emission rows and a head count for
/// population rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub year: i32,
    pub category: Category,
    pub kind: RecordType,
    pub value: f64,
    pub note: Option<String>,
}

impl Record {
    pub fn new(year: i32, category: Category, kind: RecordType, value: f64) -> Self {
        Self {
            year,
            category,
            kind,
            value,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn note_str(&self) -> &str {
        self.note.as_deref().unwrap_or("")
    }
}

/// Round to two decimal places, half away from zero.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Rejects records that break the value-domain rules: negative values, or
/// non-integral population counts.
pub fn ensure_valid(record: &Record) -> Result<()> {
    if !record.value.is_finite() || record.value < 0.0 {
        bail!(
            "{} {} {}: value {} must be a non-negative number",
            record.year,
            record.category,
            record.kind,
            record.value
        );
    }
    if record.category == Category::Einwohner && record.value.fract() != 0.0 {
        bail!(
            "{} population value {} is not a whole count",
            record.year,
            record.value
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_labels_round_trip() {
        for c in [
            Category::Gesamt,
            Category::Wirtschaft,
            Category::PrivateHaushalte,
            Category::Haushalte,
            Category::Verkehr,
            Category::KommunaleEinrichtungen,
            Category::Einwohner,
        ] {
            assert_eq!(Category::from_str(c.as_str()), Some(c));
        }
        assert_eq!(Category::from_str("Industrie"), None);
    }

    #[test]
    fn household_spellings_stay_distinct() {
        assert_ne!(
            Category::from_str("Haushalte"),
            Category::from_str("Private Haushalte")
        );
    }

    #[test]
    fn round2_rounds_half_away_from_zero() {
        assert_eq!(round2(1.005_000_1), 1.01);
        assert_eq!(round2(2691.759), 2691.76);
        assert_eq!(round2(0.0), 0.0);
    }

    #[test]
    fn negative_and_fractional_population_rejected() {
        let neg = Record::new(2017, Category::Gesamt, RecordType::Real, -1.0);
        assert!(ensure_valid(&neg).is_err());

        let frac = Record::new(2019, Category::Einwohner, RecordType::Einwohner, 10.5);
        assert!(ensure_valid(&frac).is_err());

        let ok = Record::new(2019, Category::Einwohner, RecordType::Einwohner, 593145.0);
        assert!(ensure_valid(&ok).is_ok());
    }
}
