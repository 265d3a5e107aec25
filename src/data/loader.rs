use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{
    DataType, Date32Type, Date64Type, Float32Type, Float64Type, Int32Type, Int64Type, TimeUnit,
    TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType,
};
use chrono::NaiveDate;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::error::{DataError, Result};
use super::model::{Dataset, Record, Value};
use super::schema::{ColumnKind, ColumnSpec, Schema};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a dataset from a file, parsing it against `schema`. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row followed by one record per line
/// * `.json`    – `[{ "Category": "X", "Total_Sales": 10.5, ... }, ...]`
/// * `.parquet` – flat columns (utf8 or dictionary, integer/float, date or timestamp)
///
/// Columns not named by the schema are ignored. A missing file is reported
/// as [`DataError::NotFound`], whatever its extension.
pub fn load_file(path: &Path, schema: &Schema) -> Result<Dataset> {
    schema.validate()?;
    std::fs::metadata(path).map_err(|e| DataError::from_io(path, e))?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dataset = match ext.as_str() {
        "csv" => load_csv(path, schema),
        "json" => load_json(path, schema),
        "parquet" | "pq" => load_parquet(path, schema),
        other => Err(DataError::UnsupportedFormat(other.to_string())),
    }?;

    log::info!(
        "Loaded {} records with columns {:?} from {}",
        dataset.len(),
        schema.column_names().collect::<Vec<_>>(),
        path.display()
    );
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// Field parsing shared by the text-based loaders
// ---------------------------------------------------------------------------

fn parse_field(raw: &str, col: &ColumnSpec, row: usize, date_format: &str) -> Result<Value> {
    let s = raw.trim();
    let parse_err = |reason: String| DataError::Parse {
        row,
        column: col.name.clone(),
        value: raw.to_string(),
        reason,
    };

    match col.kind {
        ColumnKind::Categorical if s.is_empty() => Ok(Value::Null),
        ColumnKind::Categorical => Ok(Value::Text(s.to_string())),
        ColumnKind::Numeric => match s.parse::<f64>() {
            // f64::from_str accepts "NaN" and "inf".
            Ok(v) if v.is_finite() => Ok(Value::Number(v)),
            Ok(_) => Err(parse_err("not a finite number".into())),
            Err(e) => Err(parse_err(e.to_string())),
        },
        ColumnKind::Date => NaiveDate::parse_from_str(s, date_format)
            .map(Value::Date)
            .map_err(|e| parse_err(format!("{e}, expected format {date_format}"))),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, then one record per line.
/// Every schema column must appear in the header.
fn load_csv(path: &Path, schema: &Schema) -> Result<Dataset> {
    let file = File::open(path).map_err(|e| DataError::from_io(path, e))?;
    read_csv(file, schema)
}

/// Parse CSV from any reader. Exposed for in-memory sources.
pub fn read_csv<R: std::io::Read>(source: R, schema: &Schema) -> Result<Dataset> {
    let mut reader = csv::Reader::from_reader(source);
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let indices: Vec<(usize, &ColumnSpec)> = schema
        .columns
        .iter()
        .map(|col| {
            headers
                .iter()
                .position(|h| *h == col.name)
                .map(|idx| (idx, col))
                .ok_or_else(|| DataError::MissingColumn(col.name.clone()))
        })
        .collect::<Result<_>>()?;

    let mut records = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result?;
        let mut values = BTreeMap::new();
        for &(idx, col) in &indices {
            let raw = record.get(idx).unwrap_or("");
            values.insert(
                col.name.clone(),
                parse_field(raw, col, row_no, &schema.date_format)?,
            );
        }
        records.push(Record { values });
    }

    Dataset::from_records(schema.clone(), records)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Product_Name": "Laptop", "Category": "Electronics",
///     "Date_Sold": "2024-01-01", "Total_Sales": 1200.0 },
///   ...
/// ]
/// ```
fn load_json(path: &Path, schema: &Schema) -> Result<Dataset> {
    let text = std::fs::read_to_string(path).map_err(|e| DataError::from_io(path, e))?;
    let root: JsonValue = serde_json::from_str(&text)?;

    let rows = root.as_array().ok_or_else(|| DataError::Parse {
        row: 0,
        column: String::new(),
        value: truncate(&root.to_string()),
        reason: "expected a top-level JSON array".into(),
    })?;

    let mut records = Vec::with_capacity(rows.len());

    for (i, rec) in rows.iter().enumerate() {
        let obj = rec.as_object().ok_or_else(|| DataError::Parse {
            row: i,
            column: String::new(),
            value: truncate(&rec.to_string()),
            reason: "row is not a JSON object".into(),
        })?;

        let mut values = BTreeMap::new();
        for col in &schema.columns {
            let raw = obj
                .get(&col.name)
                .ok_or_else(|| DataError::MissingColumn(col.name.clone()))?;
            values.insert(col.name.clone(), json_to_value(raw, col, i, &schema.date_format)?);
        }
        records.push(Record { values });
    }

    Dataset::from_records(schema.clone(), records)
}

fn json_to_value(val: &JsonValue, col: &ColumnSpec, row: usize, date_format: &str) -> Result<Value> {
    match (col.kind, val) {
        (ColumnKind::Categorical, JsonValue::Null) => Ok(Value::Null),
        (ColumnKind::Categorical, JsonValue::String(s)) => parse_field(s, col, row, date_format),
        // Numeric codes used as categories ("Store 12") are kept as text.
        (ColumnKind::Categorical, other) => Ok(Value::Text(other.to_string())),
        (ColumnKind::Numeric, JsonValue::Number(n)) => {
            n.as_f64().map(Value::Number).ok_or_else(|| DataError::Parse {
                row,
                column: col.name.clone(),
                value: n.to_string(),
                reason: "number out of range".into(),
            })
        }
        (_, JsonValue::String(s)) => parse_field(s, col, row, date_format),
        (kind, other) => Err(DataError::Parse {
            row,
            column: col.name.clone(),
            value: truncate(&other.to_string()),
            reason: format!("expected a {kind} value"),
        }),
    }
}

fn truncate(s: &str) -> String {
    const MAX: usize = 40;
    match s.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with flat columns.
///
/// Accepted physical types per schema column:
/// - categorical: Utf8 / LargeUtf8, or a dictionary of them such as a Pandas
///   `category` column (nulls become [`Value::Null`])
/// - numeric: Int32, Int64, Float32, Float64 (finite values only)
/// - date: Date32, Date64, Timestamp (any unit; the UTC calendar date is
///   kept), or Utf8 text in the schema's date format
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path, schema: &Schema) -> Result<Dataset> {
    let file = File::open(path).map_err(|e| DataError::from_io(path, e))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut records = Vec::new();
    let mut row_base = 0;

    for batch_result in reader {
        let batch = batch_result?;
        let batch_schema = batch.schema();

        let columns: Vec<(&ColumnSpec, ArrayRef)> = schema
            .columns
            .iter()
            .map(|col| -> Result<(&ColumnSpec, ArrayRef)> {
                let idx = batch_schema
                    .index_of(&col.name)
                    .map_err(|_| DataError::MissingColumn(col.name.clone()))?;
                let array = batch.column(idx);
                match array.data_type() {
                    DataType::Dictionary(_, _) => Ok((col, cast(array.as_ref(), &DataType::Utf8)?)),
                    _ => Ok((col, Arc::clone(array))),
                }
            })
            .collect::<Result<_>>()?;

        for row in 0..batch.num_rows() {
            let mut values = BTreeMap::new();
            for (col, array) in &columns {
                let value = extract_value(array, col, row, row_base + row, &schema.date_format)?;
                values.insert(col.name.clone(), value);
            }
            records.push(Record { values });
        }
        row_base += batch.num_rows();
    }

    Dataset::from_records(schema.clone(), records)
}

/// Extract a single value from an Arrow column at `row` within its batch.
/// `abs_row` is the row index across the whole file, for error reporting.
fn extract_value(
    array: &ArrayRef,
    col: &ColumnSpec,
    row: usize,
    abs_row: usize,
    date_format: &str,
) -> Result<Value> {
    let unsupported = |dt: &DataType| DataError::Parse {
        row: abs_row,
        column: col.name.clone(),
        value: format!("{dt:?}"),
        reason: format!("unsupported Arrow type for a {} column", col.kind),
    };

    if array.is_null(row) {
        return match col.kind {
            ColumnKind::Categorical => Ok(Value::Null),
            kind => Err(DataError::Parse {
                row: abs_row,
                column: col.name.clone(),
                value: "null".into(),
                reason: format!("null in a {kind} column"),
            }),
        };
    }

    let finite = |v: f64| {
        if v.is_finite() {
            Ok(Value::Number(v))
        } else {
            Err(DataError::Parse {
                row: abs_row,
                column: col.name.clone(),
                value: v.to_string(),
                reason: "not a finite number".into(),
            })
        }
    };

    match (col.kind, array.data_type()) {
        (_, DataType::Utf8) => {
            parse_field(array.as_string::<i32>().value(row), col, abs_row, date_format)
        }
        (_, DataType::LargeUtf8) => {
            parse_field(array.as_string::<i64>().value(row), col, abs_row, date_format)
        }
        (ColumnKind::Numeric, DataType::Int32) => Ok(Value::Number(
            array.as_primitive::<Int32Type>().value(row) as f64,
        )),
        (ColumnKind::Numeric, DataType::Int64) => Ok(Value::Number(
            array.as_primitive::<Int64Type>().value(row) as f64,
        )),
        (ColumnKind::Numeric, DataType::Float32) => {
            finite(array.as_primitive::<Float32Type>().value(row) as f64)
        }
        (ColumnKind::Numeric, DataType::Float64) => {
            finite(array.as_primitive::<Float64Type>().value(row))
        }
        (ColumnKind::Date, DataType::Date32) => array
            .as_primitive::<Date32Type>()
            .value_as_date(row)
            .map(Value::Date)
            .ok_or_else(|| unsupported(array.data_type())),
        (ColumnKind::Date, DataType::Date64) => array
            .as_primitive::<Date64Type>()
            .value_as_date(row)
            .map(Value::Date)
            .ok_or_else(|| unsupported(array.data_type())),
        (ColumnKind::Date, DataType::Timestamp(unit, _)) => {
            let datetime = match unit {
                TimeUnit::Second => array
                    .as_primitive::<TimestampSecondType>()
                    .value_as_datetime(row),
                TimeUnit::Millisecond => array
                    .as_primitive::<TimestampMillisecondType>()
                    .value_as_datetime(row),
                TimeUnit::Microsecond => array
                    .as_primitive::<TimestampMicrosecondType>()
                    .value_as_datetime(row),
                TimeUnit::Nanosecond => array
                    .as_primitive::<TimestampNanosecondType>()
                    .value_as_datetime(row),
            };
            datetime
                .map(|dt| Value::Date(dt.date()))
                .ok_or_else(|| unsupported(array.data_type()))
        }
        (_, other) => Err(unsupported(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new(vec![
            ColumnSpec::new("Product", ColumnKind::Categorical),
            ColumnSpec::new("Date", ColumnKind::Date),
            ColumnSpec::new("Total", ColumnKind::Numeric),
        ])
        .unwrap()
    }

    #[test]
    fn reads_csv_and_ignores_extra_columns() {
        let csv = "Product,Date,Total,Note\nA,2024-01-01,100,x\nB,2024-01-02,50.5,\n";
        let ds = read_csv(csv.as_bytes(), &schema()).unwrap();
        assert_eq!(ds.len(), 2);
        let second = &ds.records()[1];
        assert_eq!(second.get("Total"), Some(&Value::Number(50.5)));
        assert!(second.get("Note").is_none());
    }

    #[test]
    fn bad_date_reports_row_and_column() {
        let csv = "Product,Date,Total\nA,2024-01-01,1\nB,01/02/2024,2\n";
        match read_csv(csv.as_bytes(), &schema()) {
            Err(DataError::Parse { row, column, value, .. }) => {
                assert_eq!(row, 1);
                assert_eq!(column, "Date");
                assert_eq!(value, "01/02/2024");
            }
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn bad_number_is_a_parse_error() {
        let csv = "Product,Date,Total\nA,2024-01-01,lots\n";
        assert!(matches!(
            read_csv(csv.as_bytes(), &schema()),
            Err(DataError::Parse { ref column, .. }) if column == "Total"
        ));
    }

    #[test]
    fn missing_header_column() {
        let csv = "Product,Total\nA,1\n";
        assert!(matches!(
            read_csv(csv.as_bytes(), &schema()),
            Err(DataError::MissingColumn(ref c)) if c == "Date"
        ));
    }

    #[test]
    fn empty_categorical_cell_is_null() {
        let csv = "Product,Date,Total\n,2024-01-01,1\n";
        let ds = read_csv(csv.as_bytes(), &schema()).unwrap();
        assert_eq!(ds.records()[0].get("Product"), Some(&Value::Null));
    }

    #[test]
    fn non_finite_numbers_are_parse_errors() {
        for cell in ["NaN", "inf", "-infinity"] {
            let csv = format!("Product,Date,Total\nA,2024-01-01,100\nB,2024-01-02,{cell}\n");
            match read_csv(csv.as_bytes(), &schema()) {
                Err(DataError::Parse { row, column, .. }) => {
                    assert_eq!(row, 1);
                    assert_eq!(column, "Total");
                }
                other => panic!("{cell}: expected a parse error, got {other:?}"),
            }
        }
    }

    #[test]
    fn unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        let err = load_file(file.path(), &schema()).unwrap_err();
        assert!(matches!(err, DataError::UnsupportedFormat(ref e) if e == "xlsx"));
    }

    #[test]
    fn missing_file_is_not_found() {
        for path in [
            "/definitely/not/here/sales.csv",
            "/definitely/not/here/sales.xlsx",
            "/definitely/not/here/sales",
        ] {
            let err = load_file(Path::new(path), &schema()).unwrap_err();
            assert!(err.is_not_found(), "{path}: {err}");
        }
    }
}
