//! Arrow conversion of relation tables

use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanArray, Float64Array, Int64Array, RecordBatch, RecordBatchOptions, StringArray,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use serde_json::Value;

use crate::table::{ColumnType, Table, cell_text};

/// Output column carrying the parent document id of keyed tables.
pub const EID_COLUMN: &str = "eid";

pub fn arrow_type(ty: ColumnType) -> DataType {
    match ty {
        ColumnType::Boolean => DataType::Boolean,
        ColumnType::Int64 => DataType::Int64,
        ColumnType::Float64 => DataType::Float64,
        ColumnType::Utf8 => DataType::Utf8,
    }
}

/// Convert a table to a record batch; keyed tables get `eid` as first column.
pub fn to_record_batch(table: &Table) -> Result<RecordBatch, ArrowError> {
    let mut fields = Vec::with_capacity(table.columns().len() + 1);
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(fields.capacity());

    if let Some(keys) = table.keys() {
        fields.push(Field::new(EID_COLUMN, DataType::Utf8, false));
        arrays.push(Arc::new(StringArray::from_iter_values(keys.iter().map(|k| &*k.eid))));
    }

    for (idx, (name, ty)) in table.columns().iter().zip(table.column_types()).enumerate() {
        let cells = table.rows().iter().map(|r| &r[idx]);
        fields.push(Field::new(name, arrow_type(ty), true));
        arrays.push(column_array(ty, cells));
    }

    let options = RecordBatchOptions::new().with_row_count(Some(table.num_rows()));
    RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), arrays, &options)
}

fn column_array<'a>(ty: ColumnType, cells: impl Iterator<Item = &'a Value>) -> ArrayRef {
    match ty {
        ColumnType::Boolean => Arc::new(cells.map(Value::as_bool).collect::<BooleanArray>()),
        ColumnType::Int64 => Arc::new(cells.map(Value::as_i64).collect::<Int64Array>()),
        ColumnType::Float64 => Arc::new(cells.map(Value::as_f64).collect::<Float64Array>()),
        ColumnType::Utf8 => Arc::new(cells.map(cell_text).collect::<StringArray>()),
    }
}
