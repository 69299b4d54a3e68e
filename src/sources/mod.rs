// src/sources/mod.rs
pub mod emissions;
pub mod population;

use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, StringRecord};
use encoding_rs::WINDOWS_1252;
use std::{fs, path::Path};
use tracing::{debug, warn};

use crate::revision::TextEncoding;

/// Reads `path` fully and decodes it to UTF-8.
///
/// Latin-1 exports are decoded as windows-1252, which is the superset
/// the statistics office tooling actually writes.
pub fn read_text(path: &Path, encoding: TextEncoding) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    match encoding {
        TextEncoding::Utf8 => {
            let text = String::from_utf8(bytes)
                .with_context(|| format!("{} is not valid UTF-8", path.display()))?;
            Ok(text.trim_start_matches('\u{feff}').to_string())
        }
        TextEncoding::Latin1 => {
            let (text, _, had_errors) = WINDOWS_1252.decode(&bytes);
            if had_errors {
                warn!(path = %path.display(), "replacement characters while decoding latin-1");
            }
            Ok(text.into_owned())
        }
    }
}

/// Parses delimited text into raw records, keeping ragged rows.
pub fn read_records(
    text: &str,
    delimiter: char,
    has_headers: bool,
    origin: &Path,
) -> Result<Vec<StringRecord>> {
    let delimiter = u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| anyhow!("delimiter `{}` is not a single ASCII character", delimiter))?;
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(has_headers)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result
            .with_context(|| format!("CSV parse error in {} at record {}", origin.display(), idx))?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        rows.push(record);
    }
    debug!(path = %origin.display(), rows = rows.len(), "records read");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn latin1_umlauts_decoded() -> Result<()> {
        let tmp = NamedTempFile::new()?;
        // "Bevölkerung;Größe" in ISO-8859-1
        fs::write(
            tmp.path(),
            b"Bev\xf6lkerung;Gr\xf6\xdfe\n",
        )?;
        let text = read_text(tmp.path(), TextEncoding::Latin1)?;
        assert_eq!(text, "Bevölkerung;Größe\n");
        assert!(read_text(tmp.path(), TextEncoding::Utf8).is_err());
        Ok(())
    }

    #[test]
    fn non_ascii_delimiter_rejected() {
        let err = read_records("a§b\n", '§', false, Path::new("mem.csv")).unwrap_err();
        assert!(err.to_string().contains("ASCII"));
    }

    #[test]
    fn blank_rows_skipped_and_ragged_rows_kept() -> Result<()> {
        let text = "a;b;c\n1;2;3\n;;\n4;5\n";
        let rows = read_records(text, ';', true, Path::new("mem.csv"))?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].len(), 2);
        Ok(())
    }
}
