use std::f64::consts::PI;

use super::model::{EngineDataset, EngineRecord, Value};

// ---------------------------------------------------------------------------
// Derived columns
// ---------------------------------------------------------------------------

/// Metrics blended into the balanced score, with their direction:
/// positive weight = more is better, negative = less is better.
const BALANCED_METRICS: &[(&str, f64)] = &[
    ("engine_hp", 1.0),
    ("acceleration_0_100_km_h_s", -1.0),
    ("mixed_fuel_consumption_per_100_km_l", -1.0),
    ("co2_emissions_g_km", -1.0),
];

/// Derive computed columns on every record:
///
/// * `year` – aliased from `year_from`
/// * `bore_mm` / `stroke_mm` – parsed out of the combined bore-and-stroke
///   text column, with `cylinder_bore_mm` as bore fallback
/// * `displacement_l` – cylindrical swept volume from bore/stroke/cylinders,
///   falling back to `capacity_cm3`
/// * `hp_per_liter` – power density
/// * `engine_signature` – display identity string
/// * `balanced_score` – z-score composite of power, acceleration, fuel, CO2
///
/// Every derivation is a pure function of fields already on the record (the
/// balanced-score statistics are computed once over the input set). A missing
/// input leaves the derived field missing; a field already present in the
/// source is never overwritten.
pub fn add_engine_features(dataset: EngineDataset) -> EngineDataset {
    let stats = balanced_stats(&dataset);

    let mut records = dataset.records;
    for record in &mut records {
        if let Some(year) = record.get("year_from").cloned() {
            if !year.is_null() {
                record.set_if_missing("year", year);
            }
        }

        derive_bore_stroke(record);
        derive_displacement(record);
        derive_power_density(record);

        record.set("engine_signature", Value::String(engine_signature(record)));
        match balanced_score(record, &stats) {
            Some(score) => record.set("balanced_score", Value::Float(score)),
            None => record.set("balanced_score", Value::Null),
        }
    }

    EngineDataset::from_records(records)
}

// ---------------------------------------------------------------------------
// Bore / stroke extraction
// ---------------------------------------------------------------------------

/// Pull (bore, stroke) out of free text like `"82.5x92.8 mm"`: the first two
/// numbers in the string, in order.
pub fn parse_bore_stroke(value: &str) -> (Option<f64>, Option<f64>) {
    let numbers = extract_numbers(value);
    match numbers.len() {
        0 => (None, None),
        1 => (Some(numbers[0]), None),
        _ => (Some(numbers[0]), Some(numbers[1])),
    }
}

fn extract_numbers(s: &str) -> Vec<f64> {
    let mut numbers = Vec::new();
    let mut current = String::new();
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_digit() {
            current.push(c);
        } else if c == '.'
            && !current.is_empty()
            && !current.contains('.')
            && chars.peek().is_some_and(|n| n.is_ascii_digit())
        {
            current.push(c);
        } else if !current.is_empty() {
            if let Ok(v) = current.parse() {
                numbers.push(v);
            }
            current.clear();
        }
    }
    if !current.is_empty() {
        if let Ok(v) = current.parse() {
            numbers.push(v);
        }
    }
    numbers
}

fn derive_bore_stroke(record: &mut EngineRecord) {
    if let Some(text) = record
        .text("cylinder_bore_and_stroke_cycle_mm")
        .map(str::to_string)
    {
        let (bore, stroke) = parse_bore_stroke(&text);
        if let Some(b) = bore {
            record.set_if_missing("bore_mm", Value::Float(b));
        }
        if let Some(s) = stroke {
            record.set_if_missing("stroke_mm", Value::Float(s));
        }
    }
    if let Some(bore) = record.number("cylinder_bore_mm") {
        record.set_if_missing("bore_mm", Value::Float(bore));
    }
}

// ---------------------------------------------------------------------------
// Displacement
// ---------------------------------------------------------------------------

/// Swept volume in litres: π · (bore/2)² · stroke · cylinders, bore and
/// stroke in millimetres. Any missing or non-positive input yields `None`.
pub fn compute_displacement_l(
    bore_mm: Option<f64>,
    stroke_mm: Option<f64>,
    cylinders: Option<f64>,
) -> Option<f64> {
    let (bore, stroke, cyl) = (bore_mm?, stroke_mm?, cylinders?);
    if bore <= 0.0 || stroke <= 0.0 || cyl <= 0.0 {
        return None;
    }
    let volume_mm3 = PI * (bore / 2.0).powi(2) * stroke * cyl;
    Some(volume_mm3 / 1_000_000.0)
}

fn derive_displacement(record: &mut EngineRecord) {
    if record.number("displacement_l").is_some() {
        return;
    }
    let derived = compute_displacement_l(
        record.number("bore_mm"),
        record.number("stroke_mm"),
        record.number("number_of_cylinders"),
    )
    .or_else(|| {
        record
            .number("capacity_cm3")
            .filter(|c| *c > 0.0)
            .map(|c| c / 1000.0)
    });
    if let Some(d) = derived {
        record.set("displacement_l", Value::Float(d));
    }
}

fn derive_power_density(record: &mut EngineRecord) {
    if record.number("hp_per_liter").is_some() {
        return;
    }
    let (Some(hp), Some(disp)) = (record.number("engine_hp"), record.number("displacement_l"))
    else {
        return;
    };
    if disp > 0.0 {
        record.set("hp_per_liter", Value::Float(hp / disp));
    }
}

// ---------------------------------------------------------------------------
// Engine signature
// ---------------------------------------------------------------------------

/// Display identity: "make engine_type layout cylinders X.XXL", built from
/// whatever fields are present.
fn engine_signature(record: &EngineRecord) -> String {
    let mut parts: Vec<String> = Vec::new();
    for col in ["make", "engine_type", "cylinder_layout"] {
        if let Some(text) = record.text(col) {
            parts.push(text.to_string());
        }
    }
    if let Some(cyl) = record.number("number_of_cylinders") {
        parts.push(format!("{}", cyl as i64));
    }
    if let Some(disp) = record.number("displacement_l") {
        parts.push(format!("{disp:.2}L"));
    }
    parts.join(" ")
}

// ---------------------------------------------------------------------------
// Balanced score
// ---------------------------------------------------------------------------

struct MetricStats {
    column: &'static str,
    weight: f64,
    mean: f64,
    /// `None` when the column has fewer than two values or zero spread;
    /// the metric then contributes a flat zero for every record.
    std: Option<f64>,
}

fn balanced_stats(dataset: &EngineDataset) -> Vec<MetricStats> {
    BALANCED_METRICS
        .iter()
        .filter(|(col, _)| dataset.has_column(col))
        .map(|&(col, weight)| {
            let values: Vec<f64> = dataset
                .records
                .iter()
                .filter_map(|r| r.number(col))
                .collect();
            let n = values.len();
            let mean = if n > 0 {
                values.iter().sum::<f64>() / n as f64
            } else {
                0.0
            };
            let std = if n > 1 {
                let var =
                    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n as f64 - 1.0);
                let s = var.sqrt();
                (s > 0.0).then_some(s)
            } else {
                None
            };
            MetricStats {
                column: col,
                weight,
                mean,
                std,
            }
        })
        .collect()
}

/// Mean of the record's weighted per-metric z-scores, skipping metrics the
/// record is missing. `None` when nothing contributes.
fn balanced_score(record: &EngineRecord, stats: &[MetricStats]) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for stat in stats {
        match stat.std {
            Some(std) => {
                if let Some(v) = record.number(stat.column) {
                    sum += (v - stat.mean) / std * stat.weight;
                    count += 1;
                }
            }
            // Degenerate spread: flat zero contribution for every record.
            None => {
                count += 1;
            }
        }
    }
    (count > 0).then(|| sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[(&str, Value)]) -> EngineRecord {
        let mut rec = EngineRecord::new(0);
        for (col, val) in fields {
            rec.set(col, val.clone());
        }
        rec
    }

    #[test]
    fn bore_stroke_parses_combined_text() {
        assert_eq!(parse_bore_stroke("82.5x92.8 mm"), (Some(82.5), Some(92.8)));
        assert_eq!(parse_bore_stroke("80 x 70"), (Some(80.0), Some(70.0)));
        assert_eq!(parse_bore_stroke("84"), (Some(84.0), None));
        assert_eq!(parse_bore_stroke("unknown"), (None, None));
    }

    #[test]
    fn displacement_formula_matches_cylindrical_volume() {
        // 4 cylinders, bore 80 mm, stroke 70 mm:
        // π · 40² · 70 · 4 / 1e6 ≈ 1.4074 L
        let disp = compute_displacement_l(Some(80.0), Some(70.0), Some(4.0)).unwrap();
        assert!((disp - 1.40743).abs() < 1e-4);

        assert_eq!(compute_displacement_l(None, Some(70.0), Some(4.0)), None);
        assert_eq!(compute_displacement_l(Some(-1.0), Some(70.0), Some(4.0)), None);
    }

    #[test]
    fn derivation_fills_missing_displacement_only() {
        let with_disp = record(&[
            ("make", Value::String("Ford".into())),
            ("displacement_l", Value::Float(2.0)),
            ("bore_mm", Value::Float(80.0)),
            ("stroke_mm", Value::Float(70.0)),
            ("number_of_cylinders", Value::Integer(4)),
        ]);
        let without = record(&[
            ("make", Value::String("Audi".into())),
            ("bore_mm", Value::Float(80.0)),
            ("stroke_mm", Value::Float(70.0)),
            ("number_of_cylinders", Value::Integer(4)),
        ]);
        let ds = add_engine_features(EngineDataset::from_records(vec![with_disp, without]));

        // Present value untouched, missing one derived.
        assert_eq!(ds.records[0].number("displacement_l"), Some(2.0));
        let derived = ds.records[1].number("displacement_l").unwrap();
        assert!((derived - 1.40743).abs() < 1e-4);
    }

    #[test]
    fn capacity_fallback_when_geometry_is_missing() {
        let rec = record(&[
            ("make", Value::String("Ford".into())),
            ("capacity_cm3", Value::Integer(1998)),
        ]);
        let ds = add_engine_features(EngineDataset::from_records(vec![rec]));
        assert_eq!(ds.records[0].number("displacement_l"), Some(1.998));
    }

    #[test]
    fn power_density_needs_both_inputs() {
        let full = record(&[
            ("make", Value::String("Ford".into())),
            ("engine_hp", Value::Float(150.0)),
            ("displacement_l", Value::Float(2.0)),
        ]);
        let missing_hp = record(&[
            ("make", Value::String("Audi".into())),
            ("displacement_l", Value::Float(2.0)),
        ]);
        let ds = add_engine_features(EngineDataset::from_records(vec![full, missing_hp]));
        assert_eq!(ds.records[0].number("hp_per_liter"), Some(75.0));
        assert_eq!(ds.records[1].number("hp_per_liter"), None);
    }

    #[test]
    fn signature_skips_missing_fields() {
        let rec = record(&[
            ("make", Value::String("Ford".into())),
            ("engine_type", Value::String("Gasoline".into())),
            ("number_of_cylinders", Value::Integer(4)),
            ("displacement_l", Value::Float(1.998)),
        ]);
        let ds = add_engine_features(EngineDataset::from_records(vec![rec]));
        assert_eq!(
            ds.records[0].text("engine_signature"),
            Some("Ford Gasoline 4 2.00L")
        );
    }

    #[test]
    fn balanced_score_rewards_power_and_thrift() {
        let strong = record(&[
            ("make", Value::String("A".into())),
            ("engine_hp", Value::Float(300.0)),
            ("acceleration_0_100_km_h_s", Value::Float(5.0)),
            ("mixed_fuel_consumption_per_100_km_l", Value::Float(6.0)),
        ]);
        let mut weak = record(&[
            ("make", Value::String("B".into())),
            ("engine_hp", Value::Float(80.0)),
            ("acceleration_0_100_km_h_s", Value::Float(15.0)),
            ("mixed_fuel_consumption_per_100_km_l", Value::Float(12.0)),
        ]);
        weak.id = 1;
        let ds = add_engine_features(EngineDataset::from_records(vec![strong, weak]));
        let a = ds.records[0].number("balanced_score").unwrap();
        let b = ds.records[1].number("balanced_score").unwrap();
        assert!(a > b);
    }

    #[test]
    fn feature_engineering_is_idempotent() {
        let rec = record(&[
            ("make", Value::String("Ford".into())),
            ("year_from", Value::Integer(1965)),
            ("engine_hp", Value::Float(120.0)),
            (
                "cylinder_bore_and_stroke_cycle_mm",
                Value::String("80x70".into()),
            ),
            ("number_of_cylinders", Value::Integer(4)),
        ]);
        let mut other = record(&[
            ("make", Value::String("Audi".into())),
            ("year_from", Value::Integer(1990)),
            ("engine_hp", Value::Float(200.0)),
        ]);
        other.id = 1;

        let once = add_engine_features(EngineDataset::from_records(vec![rec, other]));
        let twice = add_engine_features(once.clone());
        for (a, b) in once.records.iter().zip(&twice.records) {
            assert_eq!(a.fields, b.fields);
        }
    }
}
