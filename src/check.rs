// src/check.rs
//! Consistency checks over a consolidated table, usable on freshly built
//! records as well as on a CSV read back from disk.

use std::{collections::BTreeMap, fmt};
use tracing::debug;

use crate::record::{Category, Record, RecordType, NOTE_LAST_EMISSIONS};

#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    /// `last_emissions` must tag exactly one row.
    LastEmissionsCount(usize),
    /// The tagged row is not the newest real `Gesamt`.
    LastEmissionsMisplaced {
        year: i32,
        category: Category,
        expected_year: Option<i32>,
    },
    /// Real `Gesamt` differs from the sum of its parts.
    TotalMismatch { year: i32, total: f64, parts: f64 },
    /// The newest planned total must be the net-zero target.
    TerminalGoalNotZero { year: i32, value: f64 },
    NegativeValue {
        year: i32,
        category: Category,
        value: f64,
    },
    FractionalPopulation { year: i32, value: f64 },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::LastEmissionsCount(n) => {
                write!(f, "expected one `{}` row, found {}", NOTE_LAST_EMISSIONS, n)
            }
            Violation::LastEmissionsMisplaced {
                year,
                category,
                expected_year,
            } => write!(
                f,
                "`{}` on {} {} but newest real Gesamt is {:?}",
                NOTE_LAST_EMISSIONS, year, category, expected_year
            ),
            Violation::TotalMismatch { year, total, parts } => write!(
                f,
                "{}: Gesamt {} differs from sum of parts {}",
                year, total, parts
            ),
            Violation::TerminalGoalNotZero { year, value } => {
                write!(f, "terminal goal {} is {} instead of 0", year, value)
            }
            Violation::NegativeValue {
                year,
                category,
                value,
            } => write!(f, "{} {}: negative value {}", year, category, value),
            Violation::FractionalPopulation { year, value } => {
                write!(f, "{}: population {} is not a whole count", year, value)
            }
        }
    }
}

/// Runs every check; an empty result means the table is consistent.
///
/// Years that carry more than one real `Gesamt` row (overlapping sources)
/// are left out of the sum check.
pub fn check(records: &[Record], tolerance: f64) -> Vec<Violation> {
    let mut out = Vec::new();
    check_values(records, &mut out);
    check_last_emissions(records, &mut out);
    check_totals(records, tolerance, &mut out);
    check_terminal_goal(records, &mut out);
    debug!(rows = records.len(), violations = out.len(), "table checked");
    out
}

fn is_real_emission(r: &Record) -> bool {
    r.kind == RecordType::Real && r.category != Category::Einwohner
}

fn check_values(records: &[Record], out: &mut Vec<Violation>) {
    for r in records {
        if r.value < 0.0 {
            out.push(Violation::NegativeValue {
                year: r.year,
                category: r.category,
                value: r.value,
            });
        }
        if r.category == Category::Einwohner && r.value.fract() != 0.0 {
            out.push(Violation::FractionalPopulation {
                year: r.year,
                value: r.value,
            });
        }
    }
}

fn check_last_emissions(records: &[Record], out: &mut Vec<Violation>) {
    let tagged: Vec<&Record> = records
        .iter()
        .filter(|r| r.note_str() == NOTE_LAST_EMISSIONS)
        .collect();
    if tagged.len() != 1 {
        out.push(Violation::LastEmissionsCount(tagged.len()));
        return;
    }
    let newest = records
        .iter()
        .filter(|r| is_real_emission(r))
        .map(|r| r.year)
        .max();
    let row = tagged[0];
    if row.category != Category::Gesamt || row.kind != RecordType::Real || Some(row.year) != newest
    {
        out.push(Violation::LastEmissionsMisplaced {
            year: row.year,
            category: row.category,
            expected_year: newest,
        });
    }
}

fn check_totals(records: &[Record], tolerance: f64, out: &mut Vec<Violation>) {
    let mut by_year: BTreeMap<i32, (Vec<f64>, f64, usize)> = BTreeMap::new();
    for r in records.iter().filter(|r| is_real_emission(r)) {
        let entry = by_year.entry(r.year).or_insert((Vec::new(), 0.0, 0));
        if r.category == Category::Gesamt {
            entry.0.push(r.value);
        } else {
            entry.1 += r.value;
            entry.2 += 1;
        }
    }
    for (year, (totals, parts, n_parts)) in by_year {
        if totals.len() != 1 || n_parts == 0 {
            continue;
        }
        if (totals[0] - parts).abs() > tolerance {
            out.push(Violation::TotalMismatch {
                year,
                total: totals[0],
                parts,
            });
        }
    }
}

fn check_terminal_goal(records: &[Record], out: &mut Vec<Violation>) {
    let terminal = records
        .iter()
        .filter(|r| r.kind == RecordType::Geplant && r.category == Category::Gesamt)
        .max_by_key(|r| r.year);
    if let Some(r) = terminal {
        if r.value != 0.0 {
            out.push(Violation::TerminalGoalNotZero {
                year: r.year,
                value: r.value,
            });
        }
    }
}
