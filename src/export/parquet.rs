// src/export/parquet.rs

use arrow::{
    array::{ArrayRef, Float64Array, StringArray},
    datatypes::{DataType, Field, Schema},
    error::ArrowError,
    record_batch::RecordBatch,
};
use parquet::{
    arrow::ArrowWriter, basic::Compression, errors::ParquetError,
    file::properties::WriterProperties,
};
use std::{io::Write, sync::Arc};

use crate::model::{ResultTable, COLUMNS};

/// Arrow schema of a result table, in canonical column order.
pub fn schema() -> Schema {
    let text = |name: &str, nullable| Field::new(name, DataType::Utf8, nullable);
    Schema::new(vec![
        text(COLUMNS[0], false),
        text(COLUMNS[1], false),
        text(COLUMNS[2], true),
        text(COLUMNS[3], true),
        text(COLUMNS[4], true),
        Field::new(COLUMNS[5], DataType::Float64, true),
        Field::new(COLUMNS[6], DataType::Float64, true),
        text(COLUMNS[7], false),
    ])
}

pub fn to_record_batch(table: &ResultTable) -> Result<RecordBatch, ArrowError> {
    let rows = table.rows();
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.entity_id.as_str()))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.period.to_string()))),
        Arc::new(StringArray::from_iter(rows.iter().map(|r| r.state.map(|s| s.to_string())))),
        Arc::new(StringArray::from_iter(rows.iter().map(|r| r.sector.as_deref()))),
        Arc::new(StringArray::from_iter(rows.iter().map(|r| r.technology.as_deref()))),
        Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.capacity_value))),
        Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.production_value))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.unit.as_str()))),
    ];
    RecordBatch::try_new(Arc::new(schema()), columns)
}

/// Writes the table as one Snappy-compressed row group.
pub fn write<W: Write + Send>(table: &ResultTable, out: W) -> Result<(), ParquetError> {
    let batch = to_record_batch(table)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(out, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}
