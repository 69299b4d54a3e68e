use anyhow::{bail, Result};
use clap::Parser;
use klimadaten::{check::check, consolidate::read_csv, record::RecordType};
use std::{collections::BTreeMap, path::PathBuf};
use tracing::{error, info};

#[derive(Parser)]
#[command(author, version, about = "Check a consolidated CSV for consistency")]
struct Args {
    /// Consolidated CSV written by `klimadaten`.
    path: PathBuf,
    #[arg(long, default_value = "value")]
    value_column: String,
    #[arg(long, default_value_t = 0.05)]
    tolerance: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    let records = read_csv(&args.path, &args.value_column)?;

    let mut per_type: BTreeMap<RecordType, usize> = BTreeMap::new();
    for r in &records {
        *per_type.entry(r.kind).or_default() += 1;
    }
    let first = records.iter().map(|r| r.year).min();
    let last = records.iter().map(|r| r.year).max();
    info!(
        path = %args.path.display(),
        rows = records.len(),
        ?first,
        ?last,
        ?per_type,
        "read consolidated table"
    );

    let violations = check(&records, args.tolerance);
    if violations.is_empty() {
        info!("no violations");
        return Ok(());
    }
    for v in &violations {
        error!("{}", v);
    }
    bail!("{} violations in {}", violations.len(), args.path.display())
}
