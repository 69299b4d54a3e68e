// src/sources/emissions.rs
use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::{
    record::{ensure_valid, round2, Category, Record, RecordType, NOTE_LAST_EMISSIONS},
    revision::{EmissionUnit, EmissionsSpec},
};

use super::population::PopulationSeries;

/// Reshapes the wide literal emission table into `real` records in kilotons.
///
/// Per-capita tables only yield rows for years `population` covers, each
/// rounded to two decimals. The `Gesamt` row of the newest emitted year
/// carries the `last_emissions` note.
#[tracing::instrument(level = "info", skip_all, fields(unit = ?spec.unit))]
pub fn load(spec: &EmissionsSpec, population: &PopulationSeries) -> Result<Vec<Record>> {
    let mut out = Vec::with_capacity(spec.years.len() * spec.rows.len());

    // year-major, like a melt over the year columns
    for (col, &year) in spec.years.iter().enumerate() {
        let inhabitants = match spec.unit {
            EmissionUnit::PerCapita => match population.get(year) {
                Some(p) => p as f64,
                None => {
                    debug!(year, "no population for year, skipping per-capita column");
                    continue;
                }
            },
            _ => 0.0,
        };

        for row in &spec.rows {
            let raw = row.values[col];
            let kilotons = match spec.unit {
                EmissionUnit::Tons => raw / 1000.0,
                EmissionUnit::Kilotons => raw,
                EmissionUnit::PerCapita => round2(raw * inhabitants / 1000.0),
            };
            let rec = Record::new(year, row.category, RecordType::Real, kilotons)
                .with_note(spec.note.clone());
            ensure_valid(&rec).with_context(|| format!("emission table `{}`", spec.note))?;
            out.push(rec);
        }
    }

    mark_last_emissions(&mut out);
    info!(rows = out.len(), "emissions loaded");
    Ok(out)
}

/// Tags the newest `Gesamt` row, replacing its provenance note.
pub fn mark_last_emissions(records: &mut [Record]) {
    let newest = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.category == Category::Gesamt && r.kind == RecordType::Real)
        .max_by_key(|(_, r)| r.year)
        .map(|(i, _)| i);
    match newest {
        Some(i) => records[i].note = Some(NOTE_LAST_EMISSIONS.to_string()),
        None => warn!("no Gesamt row to mark as last emissions"),
    }
}
