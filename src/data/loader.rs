use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::Value;
use crate::error::AtlasError;

// ---------------------------------------------------------------------------
// RawTable – the dataset exactly as found on disk
// ---------------------------------------------------------------------------

/// The ingested table before any normalization: original headers and
/// per-cell typed values (strings stay strings until the normalizer runs).
#[derive(Debug, Clone)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RawTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a raw dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – delimited text with a header row (the primary format)
/// * `.json`    – records-oriented array: `[{ "Make": "...", ... }, ...]`
/// * `.parquet` – flat scalar columns (strings, ints, floats, bools)
pub fn load_file(path: &Path) -> std::result::Result<RawTable, AtlasError> {
    if !path.is_file() {
        return Err(AtlasError::MissingFile {
            path: path.to_path_buf(),
        });
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let loaded = match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => {
            return Err(AtlasError::UnsupportedFormat {
                extension: other.to_string(),
            })
        }
    };

    loaded.map_err(|source| AtlasError::Load {
        path: path.to_path_buf(),
        source,
    })
}

/// Type a raw cell the way the source would: empty → null, then integer,
/// float, bool, and finally plain text.
pub fn guess_cell_type(s: &str) -> Value {
    if s.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        // Non-finite cells ("NaN", "inf") are missing, not numbers.
        return if f.is_finite() { Value::Float(f) } else { Value::Null };
    }
    if s == "true" || s == "false" {
        return Value::Bool(s == "true");
    }
    Value::String(s.to_string())
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .context("opening CSV")?;

    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let row: Vec<Value> = (0..headers.len())
            .map(|i| guess_cell_type(record.get(i).unwrap_or("")))
            .collect();
        rows.push(row);
    }

    Ok(RawTable { headers, rows })
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Make": "Ford", "Engine HP": 130, ... },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<RawTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    // Header order: first appearance across all records.
    let mut headers: Vec<String> = Vec::new();
    for rec in records {
        if let Some(obj) = rec.as_object() {
            for key in obj.keys() {
                if !headers.iter().any(|h| h == key) {
                    headers.push(key.clone());
                }
            }
        }
    }

    let mut rows = Vec::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        let row: Vec<Value> = headers
            .iter()
            .map(|h| obj.get(h).map(json_to_value).unwrap_or(Value::Null))
            .collect();
        rows.push(row);
    }

    Ok(RawTable { headers, rows })
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Null => Value::Null,
        other => Value::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet export of the dataset.  All columns must be flat scalars
/// (strings, ints, floats, bools); anything else is rendered as text.
fn load_parquet(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut headers: Vec<String> = Vec::new();
    let mut rows: Vec<Vec<Value>> = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        if headers.is_empty() {
            headers = schema.fields().iter().map(|f| f.name().clone()).collect();
        }

        let n_rows = batch.num_rows();
        for row in 0..n_rows {
            let mut cells = Vec::with_capacity(headers.len());
            for col_idx in 0..batch.num_columns() {
                cells.push(extract_scalar(batch.column(col_idx), row));
            }
            rows.push(cells);
        }
    }

    if headers.is_empty() {
        bail!("Parquet file has no columns");
    }

    Ok(RawTable { headers, rows })
}

/// Extract a single scalar cell from an Arrow column at a given row.
fn extract_scalar(col: &Arc<dyn Array>, row: usize) -> Value {
    if col.is_null(row) {
        return Value::Null;
    }
    match col.data_type() {
        DataType::Utf8 | DataType::LargeUtf8 => {
            if let Some(s) = col.as_any().downcast_ref::<StringArray>() {
                Value::String(s.value(row).to_string())
            } else {
                // LargeStringArray
                let s = col.as_string::<i64>();
                Value::String(s.value(row).to_string())
            }
        }
        DataType::Int32 => {
            let arr = col.as_any().downcast_ref::<Int32Array>().unwrap();
            Value::Integer(arr.value(row) as i64)
        }
        DataType::Int64 => {
            let arr = col.as_any().downcast_ref::<Int64Array>().unwrap();
            Value::Integer(arr.value(row))
        }
        DataType::Float32 => {
            let arr = col.as_any().downcast_ref::<Float32Array>().unwrap();
            Value::Float(arr.value(row) as f64)
        }
        DataType::Float64 => {
            let arr = col.as_any().downcast_ref::<Float64Array>().unwrap();
            Value::Float(arr.value(row))
        }
        DataType::Boolean => {
            let arr = col.as_any().downcast_ref::<BooleanArray>().unwrap();
            Value::Bool(arr.value(row))
        }
        _ => Value::String(format!("{:?}", col.data_type())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn guess_cell_type_priorities() {
        assert_eq!(guess_cell_type(""), Value::Null);
        assert_eq!(guess_cell_type("42"), Value::Integer(42));
        assert_eq!(guess_cell_type("4.5"), Value::Float(4.5));
        assert_eq!(guess_cell_type("true"), Value::Bool(true));
        assert_eq!(guess_cell_type("N/A"), Value::String("N/A".into()));
    }

    #[test]
    fn csv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cars.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "Make,Engine HP,Number of cylinders").unwrap();
        writeln!(f, "Ford,130,4").unwrap();
        writeln!(f, "Audi,,6").unwrap();
        drop(f);

        let table = load_file(&path).unwrap();
        assert_eq!(table.headers, vec!["Make", "Engine HP", "Number of cylinders"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0][1], Value::Integer(130));
        assert_eq!(table.rows[1][1], Value::Null);
    }

    #[test]
    fn json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cars.json");
        std::fs::write(
            &path,
            r#"[{"Make":"Ford","Engine HP":130.5},{"Make":"Audi","Engine HP":null}]"#,
        )
        .unwrap();

        let table = load_file(&path).unwrap();
        assert_eq!(table.headers, vec!["Make", "Engine HP"]);
        assert_eq!(table.rows[0][1], Value::Float(130.5));
        assert_eq!(table.rows[1][1], Value::Null);
    }

    #[test]
    fn parquet_round_trip() {
        use arrow::array::{Float64Array, StringArray};
        use arrow::datatypes::{DataType, Field, Schema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;

        let schema = Arc::new(Schema::new(vec![
            Field::new("make", DataType::Utf8, false),
            Field::new("engine_hp", DataType::Float64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["Ford", "Audi"])),
                Arc::new(Float64Array::from(vec![Some(130.0), None])),
            ],
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cars.parquet");
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let table = load_file(&path).unwrap();
        assert_eq!(table.headers, vec!["make", "engine_hp"]);
        assert_eq!(table.rows[0][0], Value::String("Ford".into()));
        assert_eq!(table.rows[1][1], Value::Null);
    }

    #[test]
    fn missing_file_is_fatal() {
        let err = load_file(Path::new("/no/such/file.csv")).unwrap_err();
        assert!(matches!(err, AtlasError::MissingFile { .. }));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cars.xlsx");
        std::fs::write(&path, b"not a real workbook").unwrap();
        let err = load_file(&path).unwrap_err();
        assert!(matches!(err, AtlasError::UnsupportedFormat { .. }));
    }
}
