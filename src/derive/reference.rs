// src/derive/reference.rs
use anyhow::Result;
use tracing::info;

use crate::{
    record::{ensure_valid, Record, RecordType},
    revision::ReferenceSpec,
};

/// Baseline emissions: per-capita figures times the fixed baseline population.
pub fn reference(spec: &ReferenceSpec) -> Result<Vec<Record>> {
    let mut out = Vec::with_capacity(spec.rows.len());
    for row in &spec.rows {
        let rec = Record::new(
            spec.year,
            row.category,
            RecordType::Real,
            row.per_capita * spec.population as f64 / 1000.0,
        )
        .with_note(spec.note.clone());
        ensure_valid(&rec)?;
        out.push(rec);
    }
    info!(year = spec.year, rows = out.len(), "reference emissions derived");
    Ok(out)
}
