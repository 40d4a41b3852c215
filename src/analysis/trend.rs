use std::collections::BTreeMap;

use serde::Serialize;

use super::rank::{median, Aggregate};
use crate::data::model::EngineDataset;
use crate::error::AtlasError;

// ---------------------------------------------------------------------------
// Yearly trends
// ---------------------------------------------------------------------------

/// One point of a yearly trend series.
#[derive(Debug, Clone, Serialize)]
pub struct TrendPoint {
    pub year: i64,
    pub value: f64,
    /// Number of records contributing to this year.
    pub count: usize,
}

/// Aggregate `metric` per year over records where both year and metric are
/// present, sorted by year ascending. Backs the "over time" line charts
/// (mean horsepower, mean CO2, median cylinder count, ...).
pub fn trend_by_year(
    dataset: &EngineDataset,
    metric: &str,
    how: Aggregate,
) -> Result<Vec<TrendPoint>, AtlasError> {
    for col in ["year", metric] {
        if !dataset.has_column(col) {
            return Err(AtlasError::UnknownColumn {
                name: col.to_string(),
            });
        }
    }

    let mut grouped: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for rec in &dataset.records {
        let (Some(year), Some(value)) = (rec.number("year"), rec.number(metric)) else {
            continue;
        };
        grouped.entry(year as i64).or_default().push(value);
    }

    Ok(grouped
        .into_iter()
        .filter_map(|(year, values)| {
            let count = values.len();
            let value = match how {
                Aggregate::Mean => Some(values.iter().sum::<f64>() / count as f64),
                Aggregate::Median => median(values),
            };
            value.map(|value| TrendPoint { year, value, count })
        })
        .collect())
}
