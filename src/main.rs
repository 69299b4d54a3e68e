use anyhow::{bail, Context, Result};
use clap::Parser;
use klimadaten::{
    check::check,
    consolidate::OutputFormat,
    pipeline,
    revision::{Revision, BUILTIN},
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Consolidate CO2 emission and population series into one long-format table"
)]
struct Args {
    /// Revision file (YAML). Takes precedence over --builtin.
    #[arg(short, long)]
    revision: Option<PathBuf>,
    /// Compiled-in revision to run when no file is given.
    #[arg(long, default_value = "leipzig-2019")]
    builtin: String,
    /// Directory holding the input files of a built-in revision.
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,
    /// Override the revision's output path.
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,
    /// Refuse to write when the consistency checks report anything.
    #[arg(long)]
    strict: bool,
    /// Tolerance in kilotons for the Gesamt = sum of parts check.
    #[arg(long, default_value_t = 0.05)]
    tolerance: f64,
    /// Print the built-in revision names and exit.
    #[arg(long)]
    list: bool,
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    std::panic::set_hook(Box::new(|info| {
        eprintln!("panic: {:?}", info);
    }));

    let args = Args::parse();
    if args.list {
        for name in BUILTIN {
            println!("{}", name);
        }
        return Ok(());
    }

    // ─── 2) pick the revision ────────────────────────────────────────
    let mut rev = match &args.revision {
        Some(path) => Revision::load(path)?,
        None => {
            let mut rev = Revision::builtin(&args.builtin).with_context(|| {
                format!(
                    "unknown built-in revision `{}` (known: {})",
                    args.builtin,
                    BUILTIN.join(", ")
                )
            })?;
            rev.resolve_paths(&args.data_dir);
            rev
        }
    };
    if let Some(out) = args.output {
        rev.output = out;
    }
    info!(revision = %rev.name, output = %rev.output.display(), "startup");

    // ─── 3) build the table ──────────────────────────────────────────
    let table = pipeline::run(&rev)?;

    // ─── 4) consistency checks ───────────────────────────────────────
    let violations = check(table.records(), args.tolerance);
    for v in &violations {
        warn!("{}", v);
    }
    if args.strict && !violations.is_empty() {
        bail!("{} consistency violations, nothing written", violations.len());
    }

    // ─── 5) write ────────────────────────────────────────────────────
    table.write(&rev.output, args.format)?;
    info!(rows = table.len(), path = %rev.output.display(), "all done");
    Ok(())
}
