// src/sources/population.rs
use anyhow::{anyhow, bail, Context, Result};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::{
    parse::{parse_locale_count, parse_thousands, year_of},
    record::{Category, Record, RecordType, NOTE_LATEST},
    revision::{ForecastSpec, HistoryCsv, PopulationInput, PopulationSpec, TextEncoding},
};

use super::{read_records, read_text};

/// Head counts per calendar year, either observed or forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationSeries {
    kind: RecordType,
    counts: BTreeMap<i32, i64>,
}

impl PopulationSeries {
    pub fn new(kind: RecordType, counts: BTreeMap<i32, i64>) -> Self {
        Self { kind, counts }
    }

    pub fn kind(&self) -> RecordType {
        self.kind
    }

    pub fn get(&self, year: i32) -> Option<i64> {
        self.counts.get(&year).copied()
    }

    /// Like [`get`](Self::get) but a missing year is an error.
    pub fn require(&self, year: i32) -> Result<i64> {
        self.get(year).ok_or_else(|| {
            anyhow!(
                "no {} population for {} (covered: {:?})",
                self.kind,
                year,
                self.counts.keys().collect::<Vec<_>>()
            )
        })
    }

    pub fn latest_year(&self) -> Option<i32> {
        self.counts.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Long-format rows. Historic series tag their newest year `latest`.
    pub fn to_records(&self) -> Vec<Record> {
        let latest = match self.kind {
            RecordType::Einwohner => self.latest_year(),
            _ => None,
        };
        self.counts
            .iter()
            .map(|(&year, &count)| {
                let rec = Record::new(year, Category::Einwohner, self.kind, count as f64);
                if Some(year) == latest {
                    rec.with_note(NOTE_LATEST)
                } else {
                    rec
                }
            })
            .collect()
    }
}

/// Builds the historic series from the revision's population source and
/// injects its anchor years.
pub fn load_history(spec: &PopulationSpec) -> Result<PopulationSeries> {
    let mut counts = match &spec.source {
        PopulationInput::Literal { values } => values.clone(),
        PopulationInput::Csv(csv) => read_history_csv(csv)?,
    };
    for (&year, &count) in &spec.anchors {
        if let Some(prev) = counts.insert(year, count) {
            warn!(year, prev, anchor = count, "anchor replaces population from source");
        }
    }
    if let Some((&year, &count)) = counts.iter().find(|(_, c)| **c < 0) {
        bail!("negative population {} for {}", count, year);
    }
    info!(
        years = counts.len(),
        latest = ?counts.keys().next_back(),
        "historic population loaded"
    );
    Ok(PopulationSeries::new(RecordType::Einwohner, counts))
}

/// Reads a population history export. Rows falling into the same calendar
/// year are summed; `-` cells are skipped.
#[tracing::instrument(level = "info", skip(csv), fields(path = %csv.path.display()))]
pub fn read_history_csv(csv: &HistoryCsv) -> Result<BTreeMap<i32, i64>> {
    let text = read_text(&csv.path, csv.encoding)?;
    let rows = read_records(&text, csv.delimiter, csv.has_headers, &csv.path)?;

    let mut counts: BTreeMap<i32, i64> = BTreeMap::new();
    let mut skipped = 0usize;
    for (idx, row) in rows.iter().enumerate() {
        let year_cell = row.get(csv.year_column).ok_or_else(|| {
            anyhow!(
                "{} row {}: no year column {}",
                csv.path.display(),
                idx,
                csv.year_column
            )
        })?;
        let value_cell = row.get(csv.value_column).ok_or_else(|| {
            anyhow!(
                "{} row {}: no value column {}",
                csv.path.display(),
                idx,
                csv.value_column
            )
        })?;
        let year = year_of(year_cell)
            .with_context(|| format!("{} row {}", csv.path.display(), idx))?;
        match parse_locale_count(value_cell, csv.thousands_sep)
            .with_context(|| format!("{} row {}", csv.path.display(), idx))?
        {
            Some(count) => *counts.entry(year).or_insert(0) += count,
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        debug!(skipped, "missing population cells");
    }
    if counts.is_empty() {
        bail!("{} holds no population values", csv.path.display());
    }
    Ok(counts)
}

/// Reads the headerless forecast file: year in `year_column`, thousands
/// with a decimal comma in `value_column`.
#[tracing::instrument(level = "info", skip(spec), fields(path = %spec.path.display()))]
pub fn load_forecast(spec: &ForecastSpec) -> Result<PopulationSeries> {
    let text = read_text(&spec.path, TextEncoding::Utf8)?;
    let rows = read_records(&text, spec.delimiter, false, &spec.path)?;

    let mut counts = BTreeMap::new();
    for (idx, row) in rows.iter().enumerate() {
        let year: i32 = row
            .get(spec.year_column)
            .ok_or_else(|| anyhow!("{} row {}: no year column", spec.path.display(), idx))?
            .trim()
            .parse()
            .with_context(|| format!("{} row {}: year", spec.path.display(), idx))?;
        let cell = row.get(spec.value_column).ok_or_else(|| {
            anyhow!(
                "{} row {}: no value column {}",
                spec.path.display(),
                idx,
                spec.value_column
            )
        })?;
        let count = parse_thousands(cell)
            .with_context(|| format!("{} row {} ({})", spec.path.display(), idx, year))?;
        if counts.insert(year, count).is_some() {
            warn!(year, "duplicate forecast year, keeping the later row");
        }
    }
    info!(years = counts.len(), "population forecast loaded");
    Ok(PopulationSeries::new(RecordType::Geplant, counts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs, path::PathBuf};
    use tempfile::TempDir;

    fn forecast_spec(dir: &TempDir, body: &str) -> ForecastSpec {
        let path = dir.path().join("forecast.csv");
        fs::write(&path, body).unwrap();
        ForecastSpec {
            path,
            year_column: 0,
            value_column: 8,
            delimiter: ',',
            include_in_output: false,
        }
    }

    #[test]
    fn forecast_column_eight_scaled() -> Result<()> {
        let dir = TempDir::new()?;
        let spec = forecast_spec(
            &dir,
            "2020,a,b,c,d,e,f,g,\"593,1\"\n2030,a,b,c,d,e,f,g,\"612,4\"\n",
        );
        let fc = load_forecast(&spec)?;
        assert_eq!(fc.kind(), RecordType::Geplant);
        assert_eq!(fc.get(2020), Some(593100));
        assert_eq!(fc.get(2030), Some(612400));
        assert!(fc.to_records().iter().all(|r| r.note.is_none()));
        Ok(())
    }

    #[test]
    fn malformed_forecast_value_aborts() -> Result<()> {
        let dir = TempDir::new()?;
        let spec = forecast_spec(&dir, "2020,a,b,c,d,e,f,g,viele\n");
        let err = load_forecast(&spec).unwrap_err();
        assert!(format!("{:#}", err).contains("2020"));
        Ok(())
    }

    #[test]
    fn negative_forecast_value_aborts() -> Result<()> {
        let dir = TempDir::new()?;
        let spec = forecast_spec(&dir, "2020,a,b,c,d,e,f,g,\"-593,1\"\n");
        assert!(load_forecast(&spec).is_err());
        Ok(())
    }

    #[test]
    fn short_forecast_row_aborts() -> Result<()> {
        let dir = TempDir::new()?;
        let spec = forecast_spec(&dir, "2020,a,b\n");
        assert!(load_forecast(&spec).is_err());
        Ok(())
    }

    #[test]
    fn missing_year_reported() {
        let fc = PopulationSeries::new(RecordType::Geplant, BTreeMap::from([(2020, 1)]));
        assert_eq!(fc.require(2020).unwrap(), 1);
        assert!(fc.require(2040).is_err());
    }

    #[test]
    fn history_csv_sums_years_and_injects_anchor() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("bevoelkerung.csv");
        // ISO-8859-1 header, two mid-year rows for 2018, one missing cell.
        let mut body = b"Stichtag;Gebiet;Einwohner\n".to_vec();
        body.extend_from_slice(b"30.06.2018;Gro\xdfstadt Nord;290.000\n");
        body.extend_from_slice(b"30.06.2018;Gro\xdfstadt S\xfcd;297.000\n");
        body.extend_from_slice(b"31.12.2019;Stadt;-\n");
        body.extend_from_slice(b"31.12.2019;Stadt;593.145\n");
        fs::write(&path, body)?;

        let spec = PopulationSpec {
            source: PopulationInput::Csv(HistoryCsv {
                path: PathBuf::from(&path),
                delimiter: ';',
                encoding: TextEncoding::Latin1,
                has_headers: true,
                year_column: 0,
                value_column: 2,
                thousands_sep: Some('.'),
            }),
            anchors: BTreeMap::from([(1990, 557300)]),
        };
        let series = load_history(&spec)?;
        assert_eq!(series.get(2018), Some(587000));
        assert_eq!(series.get(2019), Some(593145));
        assert_eq!(series.get(1990), Some(557300));

        let recs = series.to_records();
        let latest: Vec<_> = recs.iter().filter(|r| r.note_str() == NOTE_LATEST).collect();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].year, 2019);
        assert!(recs
            .iter()
            .all(|r| r.category == Category::Einwohner && r.kind == RecordType::Einwohner));
        Ok(())
    }

    #[test]
    fn literal_population_marks_latest() -> Result<()> {
        let spec = PopulationSpec {
            source: PopulationInput::Literal {
                values: BTreeMap::from([(2019, 593145)]),
            },
            anchors: BTreeMap::new(),
        };
        let recs = load_history(&spec)?.to_records();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].value, 593145.0);
        assert_eq!(recs[0].note.as_deref(), Some("latest"));
        Ok(())
    }
}
