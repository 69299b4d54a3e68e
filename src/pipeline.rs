// src/pipeline.rs
use anyhow::{Context, Result};
use tracing::{info, info_span};

use crate::{
    consolidate::Consolidated,
    derive::{self, Goal},
    revision::Revision,
    sources::{emissions, population},
};

/// Runs one revision top to bottom and returns the unioned table.
///
/// Stages are appended in a fixed order: reference, emissions, goals,
/// historic population, then forecast population if the revision asks
/// for it. Any failing stage aborts the run before anything is written.
pub fn run(rev: &Revision) -> Result<Consolidated> {
    let span = info_span!("pipeline", revision = %rev.name, city = %rev.city);
    let _guard = span.enter();

    let population = population::load_history(&rev.population)
        .with_context(|| format!("revision {}: historic population", rev.name))?;
    let forecast = population::load_forecast(&rev.forecast)
        .with_context(|| format!("revision {}: population forecast", rev.name))?;

    let emissions = emissions::load(&rev.emissions, &population)
        .with_context(|| format!("revision {}: emissions", rev.name))?;
    let goals = derive::goals(&rev.goals, &forecast)
        .with_context(|| format!("revision {}: goals", rev.name))?;
    let reference = derive::reference(&rev.reference)
        .with_context(|| format!("revision {}: reference year", rev.name))?;

    let mut table = Consolidated::new(rev.value_column.clone());
    table.append("reference", reference);
    table.append("emissions", emissions);
    table.append("goals", goals.iter().map(Goal::to_record));
    table.append("population", population.to_records());
    if rev.forecast.include_in_output {
        table.append("forecast", forecast.to_records());
    }

    info!(rows = table.len(), "revision consolidated");
    Ok(table)
}
