// src/consolidate/columnar.rs
use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, Float64Array, Int32Array, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};
use std::{
    fs::{self, File},
    io::BufWriter,
    path::Path,
    sync::Arc,
};
use tracing::info;

use super::{
    delimited::{prepare_parent, tmp_path},
    Consolidated, CATEGORY_COLUMN, KEY_COLUMN, NOTE_COLUMN, TYPE_COLUMN,
};

/// Arrow schema of the consolidated table; `note` is the only nullable column.
pub fn arrow_schema(value_column: &str) -> Schema {
    Schema::new(vec![
        Field::new(KEY_COLUMN, DataType::Int32, false),
        Field::new(CATEGORY_COLUMN, DataType::Utf8, false),
        Field::new(TYPE_COLUMN, DataType::Utf8, false),
        Field::new(value_column, DataType::Float64, false),
        Field::new(NOTE_COLUMN, DataType::Utf8, true),
    ])
}

pub fn to_record_batch(table: &Consolidated) -> Result<RecordBatch> {
    let recs = table.records();
    let schema = Arc::new(arrow_schema(table.value_column()));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int32Array::from_iter_values(recs.iter().map(|r| r.year))),
        Arc::new(StringArray::from_iter_values(
            recs.iter().map(|r| r.category.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(recs.iter().map(|r| r.kind.as_str()))),
        Arc::new(Float64Array::from_iter_values(recs.iter().map(|r| r.value))),
        Arc::new(StringArray::from(
            recs.iter().map(|r| r.note.as_deref()).collect::<Vec<_>>(),
        )),
    ];
    RecordBatch::try_new(schema, columns).context("building consolidated record batch")
}

#[tracing::instrument(level = "info", skip(table), fields(path = %path.display(), rows = table.len()))]
pub fn write_parquet(table: &Consolidated, path: &Path) -> Result<()> {
    prepare_parent(path)?;
    let tmp = tmp_path(path);
    let batch = to_record_batch(table)?;

    let result = (|| -> Result<()> {
        let file = File::create(&tmp)
            .with_context(|| format!("could not create temporary file `{}`", tmp.display()))?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(BufWriter::new(file), batch.schema(), Some(props))
            .context("creating ArrowWriter for consolidated table")?;
        writer.write(&batch).context("writing consolidated batch")?;
        writer.close().context("closing ArrowWriter")?;
        Ok(())
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to rename `{}` to `{}`", tmp.display(), path.display()))?;
    info!("consolidated parquet written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Category, Record, RecordType};
    use arrow::array::Array;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use tempfile::TempDir;

    #[test]
    fn parquet_output_keeps_rows_and_nulls() -> Result<()> {
        let mut table = Consolidated::new("co2");
        table.append(
            "emissions",
            vec![
                Record::new(2017, Category::Gesamt, RecordType::Real, 3335.572)
                    .with_note("last_emissions"),
                Record::new(2030, Category::Einwohner, RecordType::Geplant, 650000.0),
            ],
        );

        let dir = TempDir::new()?;
        let path = dir.path().join("out.parquet");
        write_parquet(&table, &path)?;

        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&path)?)?.build()?;
        let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
        let batch = &batches[0];
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema().field(3).name(), "co2");

        let years = batch
            .column(0)
            .as_any()
            .downcast_ref::<Int32Array>()
            .unwrap();
        assert_eq!(years.value(1), 2030);
        let values = batch
            .column(3)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(values.value(0), 3335.572);
        let notes = batch
            .column(4)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(notes.value(0), "last_emissions");
        assert!(notes.is_null(1));
        Ok(())
    }
}
