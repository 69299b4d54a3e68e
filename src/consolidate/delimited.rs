// src/consolidate/delimited.rs
use anyhow::{anyhow, bail, Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use crate::record::{Category, Record, RecordType};

use super::Consolidated;

/// `<path>.tmp`, renamed over `path` once fully written.
pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

pub(crate) fn prepare_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }
    Ok(())
}

/// Shortest representation that parses back to the same `f64`.
pub fn format_value(v: f64) -> String {
    format!("{}", v)
}

#[tracing::instrument(level = "info", skip(table), fields(path = %path.display(), rows = table.len()))]
pub fn write_csv(table: &Consolidated, path: &Path) -> Result<()> {
    prepare_parent(path)?;
    let tmp = tmp_path(path);

    let result = (|| -> Result<()> {
        let mut wtr = WriterBuilder::new()
            .from_path(&tmp)
            .with_context(|| format!("creating {}", tmp.display()))?;
        wtr.write_record(table.header())?;
        for rec in table.records() {
            wtr.write_record([
                rec.year.to_string(),
                rec.category.as_str().to_string(),
                rec.kind.as_str().to_string(),
                format_value(rec.value),
                rec.note_str().to_string(),
            ])?;
        }
        wtr.flush().context("flushing csv writer")?;
        Ok(())
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to rename `{}` to `{}`", tmp.display(), path.display()))?;
    info!("consolidated table written");
    Ok(())
}

/// Reads a consolidated CSV back. The header must match the output layout
/// with `value_column` in fourth position.
pub fn read_csv(path: &Path, value_column: &str) -> Result<Vec<Record>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let headers = rdr.headers()?.clone();
    let layout = Consolidated::new(value_column);
    let expected = layout.header();
    if headers.iter().ne(expected.iter().copied()) {
        bail!(
            "{}: header {:?} does not match {:?}",
            path.display(),
            headers.iter().collect::<Vec<_>>(),
            expected
        );
    }

    let mut out = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let row = result.with_context(|| format!("{} record {}", path.display(), idx))?;
        let field = |i: usize| row.get(i).unwrap_or("");
        let year: i32 = field(0)
            .parse()
            .with_context(|| format!("{} record {}: year", path.display(), idx))?;
        let category = Category::from_str(field(1))
            .ok_or_else(|| anyhow!("{} record {}: unknown category `{}`", path.display(), idx, field(1)))?;
        let kind = RecordType::from_str(field(2))
            .ok_or_else(|| anyhow!("{} record {}: unknown type `{}`", path.display(), idx, field(2)))?;
        let value: f64 = field(3)
            .parse()
            .with_context(|| format!("{} record {}: value", path.display(), idx))?;
        let note = match field(4) {
            "" => None,
            n => Some(n.to_string()),
        };
        out.push(Record {
            year,
            category,
            kind,
            value,
            note,
        });
    }
    debug!(path = %path.display(), rows = out.len(), "consolidated table read");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Consolidated {
        let mut t = Consolidated::new("value");
        t.append(
            "reference",
            vec![
                Record::new(1990, Category::Gesamt, RecordType::Real, 11.31 * 557300.0 / 1000.0)
                    .with_note("Klimaschutzkonzept 2014-2020"),
            ],
        );
        t.append(
            "emissions",
            vec![
                Record::new(2017, Category::PrivateHaushalte, RecordType::Real, 1026.955)
                    .with_note("Umsetzungsbericht 2018"),
                Record::new(2017, Category::Gesamt, RecordType::Real, 3335.572)
                    .with_note("last_emissions"),
            ],
        );
        t.append(
            "goals",
            vec![Record::new(2050, Category::Gesamt, RecordType::Geplant, 0.0)
                .with_note("Ratsbeschluss, Klimanotstand")],
        );
        t.append(
            "population",
            vec![Record::new(2019, Category::Einwohner, RecordType::Einwohner, 593145.0)
                .with_note("latest")],
        );
        t
    }

    #[test]
    fn written_table_reads_back_identically() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested/leipzig-new.csv");
        let table = sample();
        write_csv(&table, &path)?;
        assert!(!tmp_path(&path).exists());

        let back = read_csv(&path, "value")?;
        assert_eq!(back, table.records());
        Ok(())
    }

    #[test]
    fn layout_matches_expected_text() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("out.csv");
        write_csv(&sample(), &path)?;
        let text = fs::read_to_string(&path)?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "year,category,type,value,note");
        assert_eq!(lines[2], "2017,Private Haushalte,real,1026.955,Umsetzungsbericht 2018");
        assert_eq!(lines[4], "2050,Gesamt,geplant,0,\"Ratsbeschluss, Klimanotstand\"");
        assert_eq!(lines[5], "2019,Einwohner,Einwohner,593145,latest");
        Ok(())
    }

    #[test]
    fn wrong_value_column_rejected() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("out.csv");
        write_csv(&sample(), &path)?;
        assert!(read_csv(&path, "co2").is_err());
        Ok(())
    }
}
