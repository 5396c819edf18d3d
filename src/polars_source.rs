#![cfg(feature = "polars")]

use crate::data_types::{shared, RawRecord, RecordSource, SharedRecord};
use eyre::{Result, WrapErr};
use polars::prelude::*;
use serde_json::Value;

/// Converts every row of `df` into a record keyed by column name.
///
/// Nulls are omitted, booleans and strings are kept, temporal values are
/// rendered as text (bind them through `date_fields`) and everything else
/// is read as a number.
pub fn records_from_dataframe(df: &DataFrame) -> Result<Vec<SharedRecord>> {
    let columns = df.get_columns();
    let mut records = Vec::with_capacity(df.height());

    for row in 0..df.height() {
        let mut record = RawRecord::new();
        for column in columns {
            let value = column
                .get(row)
                .wrap_err_with(|| format!("reading column '{}' at row {row}", column.name()))?;
            if let Some(value) = any_value_to_json(&value, column.dtype()) {
                record.insert(column.name().to_string(), value);
            }
        }
        records.push(shared(record));
    }

    Ok(records)
}

fn any_value_to_json(value: &AnyValue, dtype: &DataType) -> Option<Value> {
    match value {
        AnyValue::Null => None,
        AnyValue::Boolean(b) => Some(Value::Bool(*b)),
        AnyValue::String(s) => Some(Value::String(s.to_string())),
        AnyValue::StringOwned(s) => Some(Value::String(s.to_string())),
        _ if dtype.is_temporal() => Some(Value::String(value.to_string())),
        other => other
            .extract::<f64>()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
    }
}

/// Record source backed by a polars `DataFrame`.
pub struct PolarsRecordSource {
    df: DataFrame,
}

impl PolarsRecordSource {
    pub fn new(mut df: DataFrame) -> Self {
        // Row-wise access is much cheaper on a single chunk.
        df.rechunk_mut();
        Self { df }
    }
}

impl RecordSource for PolarsRecordSource {
    fn records(&self) -> Result<Vec<SharedRecord>> {
        records_from_dataframe(&self.df)
    }

    fn len_hint(&self) -> Option<usize> {
        Some(self.df.height())
    }
}
