use serde::Serialize;

use super::loader::RawTable;
use super::model::{EngineDataset, EngineRecord, Value};

// ---------------------------------------------------------------------------
// Column inventory
// ---------------------------------------------------------------------------

/// Columns coerced to numeric during normalization. Values that fail
/// coercion become `Value::Null`, never an error and never a zero.
pub const NUMERIC_COLUMNS: &[&str] = &[
    "year_from",
    "year_to",
    "engine_hp",
    "max_power_kw",
    "engine_hp_rpm",
    "maximum_torque_n_m",
    "acceleration_0_100_km_h_s",
    "mixed_fuel_consumption_per_100_km_l",
    "city_fuel_per_100km_l",
    "highway_fuel_per_100km_l",
    "co2_emissions_g_km",
    "battery_capacity_kw_per_h",
    "electric_range_km",
    "charging_time_h",
    "number_of_cylinders",
    "valves_per_cylinder",
];

/// Physical plausibility bounds; values outside are clamped, not dropped.
pub const OUTLIER_BOUNDS: &[(&str, f64, f64)] = &[
    ("engine_hp", 20.0, 2000.0),
    ("max_power_kw", 10.0, 1500.0),
    ("acceleration_0_100_km_h_s", 1.0, 40.0),
    ("mixed_fuel_consumption_per_100_km_l", 1.0, 40.0),
    ("co2_emissions_g_km", 0.0, 1000.0),
    ("number_of_cylinders", 1.0, 16.0),
];

/// Header typos and truncations seen in the source dataset.
const HEADER_REPAIRS: &[(&str, &str)] = &[
    ("modle", "model"),
    ("acceleration_0_100_km_h_", "acceleration_0_100_km_h_s"),
];

// ---------------------------------------------------------------------------
// Header normalization
// ---------------------------------------------------------------------------

/// Rewrite a raw header to snake_case: trim, lower-case, slashes to
/// underscores, brackets stripped, whitespace and dashes to underscores,
/// runs of underscores collapsed.
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.trim().to_lowercase().chars() {
        match ch {
            '\\' | '/' => out.push('_'),
            '(' | ')' | '[' | ']' => {}
            c if c.is_whitespace() || c == '-' => out.push('_'),
            c => out.push(c),
        }
    }
    let mut collapsed = String::with_capacity(out.len());
    for ch in out.chars() {
        if ch == '_' && collapsed.ends_with('_') {
            continue;
        }
        collapsed.push(ch);
    }
    collapsed
}

fn normalize_header(name: &str) -> String {
    let snake = to_snake_case(name);
    for (from, to) in HEADER_REPAIRS {
        if snake == *from {
            return (*to).to_string();
        }
    }
    snake
}

// ---------------------------------------------------------------------------
// Numeric coercion
// ---------------------------------------------------------------------------

/// Coerce a cell of a numeric column. Strings are cleaned (thousands
/// separators and units stripped) and parsed; unparseable cells become Null.
fn coerce_numeric(value: Value) -> Value {
    match value {
        Value::Float(f) if !f.is_finite() => Value::Null,
        Value::Integer(_) | Value::Float(_) | Value::Null => value,
        Value::Bool(_) => Value::Null,
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            match cleaned.parse::<f64>() {
                Ok(f) if f.is_finite() => Value::Float(f),
                _ => Value::Null,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Normalization pass
// ---------------------------------------------------------------------------

/// Outcome counters for a normalization run.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizeReport {
    pub rows_in: usize,
    pub rows_out: usize,
    /// Rows dropped for lacking a usable identity (no make and no model).
    pub dropped_rows: usize,
}

/// Normalize a raw table into an [`EngineDataset`]:
/// headers to snake_case, numeric columns coerced, text trimmed, rows
/// without identity dropped and counted. Never aborts on a bad row.
pub fn normalize(table: RawTable) -> (EngineDataset, NormalizeReport) {
    let headers: Vec<String> = table.headers.iter().map(|h| normalize_header(h)).collect();
    let rows_in = table.rows.len();

    let mut records = Vec::with_capacity(rows_in);
    let mut dropped = 0usize;

    for (row_no, row) in table.rows.into_iter().enumerate() {
        let mut record = EngineRecord::new(row_no);
        for (col_idx, value) in row.into_iter().enumerate() {
            let Some(name) = headers.get(col_idx) else {
                continue;
            };
            let value = match value {
                Value::String(s) => {
                    let trimmed = s.trim();
                    if trimmed.is_empty() {
                        Value::Null
                    } else if trimmed.len() == s.len() {
                        Value::String(s)
                    } else {
                        Value::String(trimmed.to_string())
                    }
                }
                other => other,
            };
            let value = if NUMERIC_COLUMNS.contains(&name.as_str()) {
                coerce_numeric(value)
            } else {
                value
            };
            record.set(name, value);
        }

        if record.text("make").is_none() && record.text("model").is_none() {
            log::debug!("dropping row {row_no}: no make or model");
            dropped += 1;
            continue;
        }
        records.push(record);
    }

    if dropped > 0 {
        log::warn!("dropped {dropped} of {rows_in} rows without identity");
    }

    let report = NormalizeReport {
        rows_in,
        rows_out: records.len(),
        dropped_rows: dropped,
    };
    (EngineDataset::from_records(records), report)
}

/// Clamp numeric columns to their physical plausibility bounds.
pub fn clip_outliers(mut dataset: EngineDataset) -> EngineDataset {
    for record in &mut dataset.records {
        for (col, low, high) in OUTLIER_BOUNDS {
            let Some(value) = record.fields.get_mut(*col) else {
                continue;
            };
            match value {
                Value::Float(f) => *f = f.clamp(*low, *high),
                Value::Integer(i) => *i = (*i).clamp(*low as i64, *high as i64),
                _ => {}
            }
        }
    }
    dataset
}

// ---------------------------------------------------------------------------
// Schema report
// ---------------------------------------------------------------------------

/// Shape and completeness of a dataset: row/column counts and per-column
/// missing tallies, most-missing first.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaReport {
    pub rows: usize,
    pub cols: usize,
    pub missing_by_col: Vec<(String, usize)>,
}

pub fn schema_report(dataset: &EngineDataset) -> SchemaReport {
    let rows = dataset.len();
    let mut missing: Vec<(String, usize)> = dataset
        .column_names
        .iter()
        .map(|col| {
            let present = dataset
                .records
                .iter()
                .filter(|r| r.get(col).is_some_and(|v| !v.is_null()))
                .count();
            (col.clone(), rows - present)
        })
        .collect();
    missing.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    SchemaReport {
        rows,
        cols: dataset.column_names.len(),
        missing_by_col: missing,
    }
}
