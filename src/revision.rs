// src/revision.rs
//! A `Revision` describes one self-contained run of the consolidation:
//! which literal tables to use, where the CSV inputs live and how they are
//! encoded. Revisions are never merged; each run executes exactly one.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::record::Category;

/// Names accepted by [`Revision::builtin`].
pub const BUILTIN: &[&str] = &["leipzig-2019"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub name: String,
    pub city: String,
    /// Output file; relative paths resolve against the revision file.
    pub output: PathBuf,
    /// Header of the value column (`value` in most revisions, `co2` in some).
    #[serde(default = "default_value_column")]
    pub value_column: String,
    pub emissions: EmissionsSpec,
    pub population: PopulationSpec,
    pub forecast: ForecastSpec,
    pub goals: GoalsSpec,
    pub reference: ReferenceSpec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmissionUnit {
    /// Absolute metric tons, divided by 1000.
    Tons,
    /// Absolute kilotons, taken as is.
    Kilotons,
    /// Tons per inhabitant, multiplied by that year's population.
    PerCapita,
}

/// Wide literal table: one value per entry of `years` on every row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionsSpec {
    pub years: Vec<i32>,
    pub rows: Vec<EmissionRow>,
    pub unit: EmissionUnit,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionRow {
    pub category: Category,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationSpec {
    pub source: PopulationInput,
    /// Counts injected for years the source does not cover (e.g. 1990).
    #[serde(default)]
    pub anchors: BTreeMap<i32, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PopulationInput {
    Literal { values: BTreeMap<i32, i64> },
    Csv(HistoryCsv),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextEncoding {
    #[default]
    #[serde(rename = "utf-8")]
    Utf8,
    #[serde(rename = "latin-1")]
    Latin1,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryCsv {
    pub path: PathBuf,
    #[serde(default = "default_history_delimiter")]
    pub delimiter: char,
    #[serde(default)]
    pub encoding: TextEncoding,
    #[serde(default = "default_true")]
    pub has_headers: bool,
    pub year_column: usize,
    pub value_column: usize,
    #[serde(default)]
    pub thousands_sep: Option<char>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSpec {
    pub path: PathBuf,
    #[serde(default)]
    pub year_column: usize,
    #[serde(default = "default_forecast_value_column")]
    pub value_column: usize,
    #[serde(default = "default_forecast_delimiter")]
    pub delimiter: char,
    /// Append the forecast population rows to the output table.
    #[serde(default)]
    pub include_in_output: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalsSpec {
    pub targets: Vec<GoalTarget>,
    pub note: String,
    pub terminal: TerminalGoal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalTarget {
    pub year: i32,
    /// Tons CO2 per inhabitant.
    pub per_capita: f64,
}

/// Absolute end target (net zero); its value is always 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalGoal {
    pub year: i32,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSpec {
    pub year: i32,
    pub population: i64,
    pub rows: Vec<PerCapitaRow>,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerCapitaRow {
    pub category: Category,
    pub per_capita: f64,
}

fn default_value_column() -> String {
    "value".to_string()
}
fn default_history_delimiter() -> char {
    ';'
}
fn default_forecast_delimiter() -> char {
    ','
}
fn default_forecast_value_column() -> usize {
    8
}
fn default_true() -> bool {
    true
}

impl Revision {
    /// Load a revision from YAML; relative paths are anchored at the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading revision file {}", path.display()))?;
        let mut rev: Revision = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing revision file {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        rev.resolve_paths(base);
        rev.validate()?;
        debug!(name = %rev.name, path = %path.display(), "revision loaded");
        Ok(rev)
    }

    /// One of the revisions compiled into the binary, see [`BUILTIN`].
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "leipzig-2019" => Some(leipzig_2019()),
            _ => None,
        }
    }

    pub fn resolve_paths(&mut self, base: &Path) {
        let anchor = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        anchor(&mut self.output);
        anchor(&mut self.forecast.path);
        if let PopulationInput::Csv(csv) = &mut self.population.source {
            anchor(&mut csv.path);
        }
    }

    /// Shape checks that the literal tables cannot express in their types.
    pub fn validate(&self) -> Result<()> {
        let width = self.emissions.years.len();
        for row in &self.emissions.rows {
            if row.values.len() != width {
                bail!(
                    "revision {}: emission row {} has {} values for {} years",
                    self.name,
                    row.category,
                    row.values.len(),
                    width
                );
            }
        }
        let mut delimiters = vec![("forecast", self.forecast.delimiter)];
        if let PopulationInput::Csv(csv) = &self.population.source {
            delimiters.push(("population", csv.delimiter));
        }
        for (source, delimiter) in delimiters {
            if !delimiter.is_ascii() {
                bail!(
                    "revision {}: {} delimiter `{}` is not ASCII",
                    self.name,
                    source,
                    delimiter
                );
            }
        }
        if self.value_column.trim().is_empty() {
            bail!("revision {}: value_column must not be empty", self.name);
        }
        if self.reference.population < 0 {
            bail!("revision {}: reference population is negative", self.name);
        }
        Ok(())
    }
}

/// Emissions from the 2018 implementation report (absolute tons), a single
/// current population figure, per-capita goals from the 2014-2020 climate
/// protection concept and the 1990 baseline.
fn leipzig_2019() -> Revision {
    use Category::*;
    let row = |category, values: [f64; 7]| EmissionRow {
        category,
        values: values.to_vec(),
    };
    Revision {
        name: "leipzig-2019".into(),
        city: "Leipzig".into(),
        output: PathBuf::from("leipzig-new.csv"),
        value_column: default_value_column(),
        emissions: EmissionsSpec {
            years: (2011..=2017).collect(),
            rows: vec![
                row(
                    Gesamt,
                    [3226146., 3357816., 3498206., 3336609., 3406229., 3392678., 3335572.],
                ),
                row(
                    Wirtschaft,
                    [1488836., 1526249., 1612484., 1542437., 1537181., 1517865., 1480633.],
                ),
                row(
                    PrivateHaushalte,
                    [968704., 1053086., 1094302., 976264., 1026631., 1034257., 1026955.],
                ),
                row(
                    Verkehr,
                    [709541., 715052., 728304., 754432., 778429., 777697., 769514.],
                ),
                row(
                    KommunaleEinrichtungen,
                    [59065., 63429., 63116., 63477., 63989., 62858., 58470.],
                ),
            ],
            unit: EmissionUnit::Tons,
            note: "Umsetzungsbericht 2018".into(),
        },
        population: PopulationSpec {
            source: PopulationInput::Literal {
                values: BTreeMap::from([(2019, 593145)]),
            },
            anchors: BTreeMap::new(),
        },
        forecast: ForecastSpec {
            path: PathBuf::from("leipzig-population-forecast-2019.csv"),
            year_column: 0,
            value_column: default_forecast_value_column(),
            delimiter: default_forecast_delimiter(),
            include_in_output: false,
        },
        goals: GoalsSpec {
            targets: vec![
                GoalTarget { year: 2020, per_capita: 4.26 },
                GoalTarget { year: 2030, per_capita: 3.48 },
                GoalTarget { year: 2040, per_capita: 2.93 },
            ],
            note: "Klimaschutzkonzept 2014-2020".into(),
            terminal: TerminalGoal {
                year: 2050,
                note: "Ratsbeschluss Klimanotstand".into(),
            },
        },
        reference: ReferenceSpec {
            year: 1990,
            population: 557300,
            rows: vec![
                PerCapitaRow { category: Wirtschaft, per_capita: 4.83 },
                PerCapitaRow { category: PrivateHaushalte, per_capita: 4.79 },
                PerCapitaRow { category: Verkehr, per_capita: 1.69 },
                PerCapitaRow { category: Gesamt, per_capita: 11.31 },
            ],
            note: "Klimaschutzkonzept 2014-2020".into(),
        },
    }
}
