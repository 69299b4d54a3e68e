// src/derive/goals.rs
use anyhow::{Context, Result};
use tracing::info;

use crate::{
    record::{ensure_valid, Category, Record, RecordType},
    revision::GoalsSpec,
    sources::population::PopulationSeries,
};

/// One planned total, before it is flattened into the output schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Goal {
    pub year: i32,
    /// Tons per inhabitant; 0 for the terminal target.
    pub per_capita: f64,
    /// Forecast population the ceiling was scaled with, if any.
    pub population: Option<i64>,
    /// Kilotons.
    pub value: f64,
    pub note: String,
}

impl Goal {
    pub fn to_record(&self) -> Record {
        Record::new(self.year, Category::Gesamt, RecordType::Geplant, self.value)
            .with_note(self.note.clone())
    }
}

/// Per-capita ceilings scaled by forecast population, followed by the
/// absolute terminal target whose value is 0 whatever the forecast says.
///
/// A target year without a forecast value aborts the run.
pub fn goals(spec: &GoalsSpec, forecast: &PopulationSeries) -> Result<Vec<Goal>> {
    let mut out = Vec::with_capacity(spec.targets.len() + 1);
    for target in &spec.targets {
        let population = forecast
            .require(target.year)
            .with_context(|| format!("deriving emission goal for {}", target.year))?;
        let goal = Goal {
            year: target.year,
            per_capita: target.per_capita,
            population: Some(population),
            value: population as f64 * target.per_capita / 1000.0,
            note: spec.note.clone(),
        };
        ensure_valid(&goal.to_record())
            .with_context(|| format!("emission goal for {}", target.year))?;
        out.push(goal);
    }
    out.push(Goal {
        year: spec.terminal.year,
        per_capita: 0.0,
        population: None,
        value: 0.0,
        note: spec.terminal.note.clone(),
    });
    info!(goals = out.len(), "emission goals derived");
    Ok(out)
}
