use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ---------------------------------------------------------------------------
// Value – a single cell of the dataset
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value. `Null` is the one explicit missing marker:
/// past the normalizer no field ever holds an unparsed numeric string.
/// Using `BTreeMap` / `BTreeSet` downstream so `Value` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

// -- Manual Eq/Ord so we can put Value in BTreeSet --

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::String(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v:.4}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl Value {
    /// Interpret the value as an `f64` for metric computations.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Interpret the value as text (numbers and bools are not text).
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

// ---------------------------------------------------------------------------
// EngineRecord – one row of the dataset
// ---------------------------------------------------------------------------

/// Stable identity of a record: the row index in the source file. Survives
/// filtering and re-ordering, and stays valid across pipeline re-runs on the
/// same input.
pub type RecordId = usize;

/// A single engine record (one row of the source table) after normalization.
#[derive(Debug, Clone)]
pub struct EngineRecord {
    pub id: RecordId,
    /// Normalized columns: snake_case column name → value.
    pub fields: BTreeMap<String, Value>,
}

impl EngineRecord {
    pub fn new(id: RecordId) -> Self {
        EngineRecord {
            id,
            fields: BTreeMap::new(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    /// Numeric view of a column; `None` for missing or non-numeric cells.
    pub fn number(&self, column: &str) -> Option<f64> {
        self.fields.get(column).and_then(Value::as_f64)
    }

    /// Text view of a column; `None` for missing or non-text cells.
    pub fn text(&self, column: &str) -> Option<&str> {
        self.fields.get(column).and_then(Value::as_str)
    }

    pub fn set(&mut self, column: &str, value: Value) {
        self.fields.insert(column.to_string(), value);
    }

    /// Insert `value` only when the column is absent or null. Derivations use
    /// this so they never overwrite data already present in the source.
    pub fn set_if_missing(&mut self, column: &str, value: Value) {
        let present = self.fields.get(column).is_some_and(|v| !v.is_null());
        if !present {
            self.fields.insert(column.to_string(), value);
        }
    }

    /// Deterministic tie-break key: (folded make, year, row id).
    /// Missing make sorts first, missing year sorts first.
    pub fn sort_key(&self) -> (String, i64, RecordId) {
        let make = self
            .text("make")
            .map(|s| s.to_lowercase())
            .unwrap_or_default();
        let year = self.number("year").map(|y| y as i64).unwrap_or(i64::MIN);
        (make, year, self.id)
    }

    /// Human-readable label: the engine signature when the feature engineer
    /// has run, otherwise "make model".
    pub fn label(&self) -> String {
        if let Some(sig) = self.text("engine_signature") {
            return sig.to_string();
        }
        let mut parts = Vec::new();
        if let Some(make) = self.text("make") {
            parts.push(make);
        }
        if let Some(model) = self.text("model") {
            parts.push(model);
        }
        parts.join(" ")
    }
}

// ---------------------------------------------------------------------------
// EngineDataset – the complete normalized dataset
// ---------------------------------------------------------------------------

/// The full dataset with a pre-computed column index.
#[derive(Debug, Clone)]
pub struct EngineDataset {
    /// All records (rows), in source order.
    pub records: Vec<EngineRecord>,
    /// Ordered list of column names present anywhere in the dataset.
    pub column_names: Vec<String>,
}

impl EngineDataset {
    /// Build the column index from the given records.
    pub fn from_records(records: Vec<EngineRecord>) -> Self {
        let mut column_names_set: BTreeSet<String> = BTreeSet::new();
        for rec in &records {
            for col in rec.fields.keys() {
                column_names_set.insert(col.clone());
            }
        }
        EngineDataset {
            records,
            column_names: column_names_set.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_names.iter().any(|c| c == name)
    }

    /// New dataset holding clones of the records at `indices`.
    pub fn select(&self, indices: &[usize]) -> EngineDataset {
        let records = indices
            .iter()
            .filter_map(|&i| self.records.get(i).cloned())
            .collect();
        EngineDataset::from_records(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_ordering_is_total() {
        let mut values = vec![
            Value::String("b".into()),
            Value::Float(1.5),
            Value::Null,
            Value::Integer(3),
            Value::Bool(true),
            Value::Float(f64::NAN),
        ];
        values.sort();
        assert_eq!(values[0], Value::Null);
        assert!(matches!(values[1], Value::Bool(true)));
        assert!(matches!(values[2], Value::Integer(3)));
    }

    #[test]
    fn as_f64_covers_numeric_variants() {
        assert_eq!(Value::Integer(4).as_f64(), Some(4.0));
        assert_eq!(Value::Float(2.5).as_f64(), Some(2.5));
        assert_eq!(Value::String("4".into()).as_f64(), None);
        assert_eq!(Value::Null.as_f64(), None);
    }

    #[test]
    fn set_if_missing_never_overwrites() {
        let mut rec = EngineRecord::new(0);
        rec.set("displacement_l", Value::Float(2.0));
        rec.set_if_missing("displacement_l", Value::Float(9.9));
        assert_eq!(rec.number("displacement_l"), Some(2.0));

        rec.set("engine_hp", Value::Null);
        rec.set_if_missing("engine_hp", Value::Float(150.0));
        assert_eq!(rec.number("engine_hp"), Some(150.0));
    }

    #[test]
    fn sort_key_orders_by_make_year_id() {
        let mut a = EngineRecord::new(5);
        a.set("make", Value::String("Audi".into()));
        a.set("year", Value::Integer(1990));
        let mut b = EngineRecord::new(1);
        b.set("make", Value::String("audi".into()));
        b.set("year", Value::Integer(1990));
        // Same folded make and year → row id decides.
        assert!(b.sort_key() < a.sort_key());
    }

    #[test]
    fn dataset_indexes_union_of_columns() {
        let mut a = EngineRecord::new(0);
        a.set("make", Value::String("Ford".into()));
        let mut b = EngineRecord::new(1);
        b.set("engine_hp", Value::Float(90.0));
        let ds = EngineDataset::from_records(vec![a, b]);
        assert_eq!(ds.column_names, vec!["engine_hp", "make"]);
        assert!(ds.has_column("make"));
        assert!(!ds.has_column("torque"));
    }
}
