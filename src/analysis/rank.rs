use std::collections::BTreeMap;

use serde::Serialize;

use crate::data::model::{EngineDataset, RecordId};
use crate::error::AtlasError;

// ---------------------------------------------------------------------------
// Ranking primitives
// ---------------------------------------------------------------------------

/// Sort direction for a metric. Horsepower ranks descending; acceleration
/// seconds and fuel consumption rank ascending ("lower is better").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Per-group aggregate used by group rankings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Aggregate {
    Mean,
    Median,
}

/// One ranked record: identity reference, display label, metric value.
#[derive(Debug, Clone, Serialize)]
pub struct RankedRecord {
    pub id: RecordId,
    pub label: String,
    pub value: f64,
}

/// One ranked group (e.g. a make) with its aggregate value and size.
#[derive(Debug, Clone, Serialize)]
pub struct GroupRank {
    pub key: String,
    pub value: f64,
    pub size: usize,
}

/// Named rankings: category label → ordered entries. Record-level and
/// group-level tables are kept apart since their entries differ.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RankingTable {
    pub records: BTreeMap<String, Vec<RankedRecord>>,
    pub groups: BTreeMap<String, Vec<GroupRank>>,
}

/// Median over the given values (midpoint average for even counts).
pub fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

fn aggregate(values: Vec<f64>, how: Aggregate) -> Option<f64> {
    match how {
        Aggregate::Median => median(values),
        Aggregate::Mean => {
            if values.is_empty() {
                None
            } else {
                Some(values.iter().sum::<f64>() / values.len() as f64)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Record-level ranking
// ---------------------------------------------------------------------------

/// Rank individual records by `metric`. Records missing the metric are
/// excluded, never treated as zero. Equal values are ordered by the identity
/// key (make, year, row id) so output is deterministic across runs.
pub fn rank_records(
    dataset: &EngineDataset,
    metric: &str,
    direction: Direction,
    limit: Option<usize>,
) -> Result<Vec<RankedRecord>, AtlasError> {
    if !dataset.has_column(metric) {
        return Err(AtlasError::UnknownColumn {
            name: metric.to_string(),
        });
    }

    let mut entries: Vec<(&crate::data::model::EngineRecord, f64)> = dataset
        .records
        .iter()
        .filter_map(|r| r.number(metric).map(|v| (r, v)))
        .collect();

    entries.sort_by(|(ra, va), (rb, vb)| {
        let ord = match direction {
            Direction::Ascending => va.total_cmp(vb),
            Direction::Descending => vb.total_cmp(va),
        };
        ord.then_with(|| ra.sort_key().cmp(&rb.sort_key()))
    });

    if let Some(n) = limit {
        entries.truncate(n);
    }

    Ok(entries
        .into_iter()
        .map(|(r, value)| RankedRecord {
            id: r.id,
            label: r.label(),
            value,
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Group-level ranking
// ---------------------------------------------------------------------------

/// Group records by `category`, aggregate `metric` per group, and rank the
/// groups. Records missing either column are excluded. Equal aggregates are
/// ordered alphabetically by group key.
pub fn rank_groups(
    dataset: &EngineDataset,
    category: &str,
    metric: &str,
    how: Aggregate,
    direction: Direction,
    limit: Option<usize>,
) -> Result<Vec<GroupRank>, AtlasError> {
    for col in [category, metric] {
        if !dataset.has_column(col) {
            return Err(AtlasError::UnknownColumn {
                name: col.to_string(),
            });
        }
    }

    let mut grouped: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for rec in &dataset.records {
        let Some(key) = rec.get(category).filter(|v| !v.is_null()) else {
            continue;
        };
        let Some(value) = rec.number(metric) else {
            continue;
        };
        grouped.entry(key.to_string()).or_default().push(value);
    }

    let mut ranks: Vec<GroupRank> = grouped
        .into_iter()
        .filter_map(|(key, values)| {
            let size = values.len();
            aggregate(values, how).map(|value| GroupRank { key, value, size })
        })
        .collect();

    ranks.sort_by(|a, b| {
        let ord = match direction {
            Direction::Ascending => a.value.total_cmp(&b.value),
            Direction::Descending => b.value.total_cmp(&a.value),
        };
        ord.then_with(|| a.key.cmp(&b.key))
    });

    if let Some(n) = limit {
        ranks.truncate(n);
    }
    Ok(ranks)
}

/// Group keys with at least `min_rows` records carrying the metric: the
/// cutoff the distribution views use to skip sparsely covered makes.
pub fn groups_with_min_rows(
    dataset: &EngineDataset,
    category: &str,
    metric: &str,
    min_rows: usize,
) -> Vec<String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for rec in &dataset.records {
        let Some(key) = rec.get(category).filter(|v| !v.is_null()) else {
            continue;
        };
        if rec.number(metric).is_some() {
            *counts.entry(key.to_string()).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .filter(|(_, n)| *n >= min_rows)
        .map(|(k, _)| k)
        .collect()
}

// ---------------------------------------------------------------------------
// Canned leaderboards
// ---------------------------------------------------------------------------

/// The "Best Engines" boards: top records per headline metric. Boards whose
/// metric column is absent from the dataset are skipped.
pub fn best_engine_boards(dataset: &EngineDataset, top: usize) -> RankingTable {
    const BOARDS: &[(&str, &str, Direction)] = &[
        ("fastest_0_100_km_h", "acceleration_0_100_km_h_s", Direction::Ascending),
        ("most_powerful", "engine_hp", Direction::Descending),
        ("most_efficient", "mixed_fuel_consumption_per_100_km_l", Direction::Ascending),
        ("best_power_density", "hp_per_liter", Direction::Descending),
        ("best_balanced", "balanced_score", Direction::Descending),
    ];

    let mut table = RankingTable::default();
    for &(label, metric, direction) in BOARDS {
        match rank_records(dataset, metric, direction, Some(top)) {
            Ok(entries) => {
                table.records.insert(label.to_string(), entries);
            }
            Err(AtlasError::UnknownColumn { .. }) => {
                log::debug!("skipping board '{label}': column '{metric}' absent");
            }
            Err(_) => unreachable!("rank_records only fails on unknown columns"),
        }
    }
    table
}

/// The "Brand Battles" boards: median horsepower (descending) and median
/// fuel consumption (ascending) per make.
pub fn brand_battle_boards(dataset: &EngineDataset, top: usize) -> RankingTable {
    const BOARDS: &[(&str, &str, Direction)] = &[
        ("median_hp_by_make", "engine_hp", Direction::Descending),
        (
            "median_fuel_by_make",
            "mixed_fuel_consumption_per_100_km_l",
            Direction::Ascending,
        ),
    ];

    let mut table = RankingTable::default();
    for &(label, metric, direction) in BOARDS {
        match rank_groups(dataset, "make", metric, Aggregate::Median, direction, Some(top)) {
            Ok(entries) => {
                table.groups.insert(label.to_string(), entries);
            }
            Err(AtlasError::UnknownColumn { .. }) => {
                log::debug!("skipping board '{label}': column '{metric}' absent");
            }
            Err(_) => unreachable!("rank_groups only fails on unknown columns"),
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{EngineRecord, Value};

    fn rec(id: usize, make: &str, year: i64, hp: Option<f64>) -> EngineRecord {
        let mut r = EngineRecord::new(id);
        r.set("make", Value::String(make.to_string()));
        r.set("year", Value::Integer(year));
        match hp {
            Some(v) => r.set("engine_hp", Value::Float(v)),
            None => r.set("engine_hp", Value::Null),
        }
        r
    }

    #[test]
    fn descending_rank_with_missing_excluded() {
        let ds = EngineDataset::from_records(vec![
            rec(0, "Ford", 1965, Some(120.0)),
            rec(1, "Audi", 1990, None),
            rec(2, "BMW", 2000, Some(300.0)),
        ]);
        let ranked = rank_records(&ds, "engine_hp", Direction::Descending, None).unwrap();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].id, 2);
        assert_eq!(ranked[1].id, 0);
    }

    #[test]
    fn ties_resolve_by_make_then_year_then_id() {
        let ds = EngineDataset::from_records(vec![
            rec(0, "Ford", 1980, Some(150.0)),
            rec(1, "Audi", 1990, Some(150.0)),
            rec(2, "Audi", 1970, Some(150.0)),
        ]);
        let ranked = rank_records(&ds, "engine_hp", Direction::Descending, None).unwrap();
        let ids: Vec<_> = ranked.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 1, 0]);
    }

    #[test]
    fn ascending_rank_for_lower_is_better() {
        let ds = EngineDataset::from_records(vec![
            rec(0, "Ford", 1965, Some(9.0)),
            rec(1, "Audi", 1990, Some(5.5)),
        ]);
        // Reuse engine_hp as the stand-in metric column.
        let ranked = rank_records(&ds, "engine_hp", Direction::Ascending, None).unwrap();
        assert_eq!(ranked[0].id, 1);
    }

    #[test]
    fn unknown_metric_is_an_error() {
        let ds = EngineDataset::from_records(vec![rec(0, "Ford", 1965, Some(1.0))]);
        let err = rank_records(&ds, "warp_factor", Direction::Descending, None).unwrap_err();
        assert!(matches!(err, AtlasError::UnknownColumn { .. }));
    }

    #[test]
    fn median_handles_even_counts() {
        assert_eq!(median(vec![1.0, 2.0, 3.0]), Some(2.0));
        assert_eq!(median(vec![1.0, 2.0, 3.0, 4.0]), Some(2.5));
        assert_eq!(median(vec![]), None);
    }

    #[test]
    fn equal_group_medians_rank_alphabetically() {
        // Ford and Audi both land on a median of 150.
        let ds = EngineDataset::from_records(vec![
            rec(0, "Ford", 1980, Some(100.0)),
            rec(1, "Ford", 1981, Some(200.0)),
            rec(2, "Audi", 1990, Some(150.0)),
            rec(3, "BMW", 2000, Some(400.0)),
        ]);
        let ranks = rank_groups(
            &ds,
            "make",
            "engine_hp",
            Aggregate::Median,
            Direction::Descending,
            None,
        )
        .unwrap();
        let keys: Vec<_> = ranks.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["BMW", "Audi", "Ford"]);
        assert_eq!(ranks[1].value, 150.0);
        assert_eq!(ranks[2].value, 150.0);
    }

    #[test]
    fn group_size_cutoff() {
        let ds = EngineDataset::from_records(vec![
            rec(0, "Ford", 1980, Some(100.0)),
            rec(1, "Ford", 1981, Some(200.0)),
            rec(2, "Audi", 1990, Some(150.0)),
            rec(3, "Audi", 1991, None),
        ]);
        assert_eq!(
            groups_with_min_rows(&ds, "make", "engine_hp", 2),
            vec!["Ford"]
        );
    }

    #[test]
    fn limit_truncates_after_sorting() {
        let ds = EngineDataset::from_records(vec![
            rec(0, "Ford", 1965, Some(120.0)),
            rec(1, "Audi", 1990, Some(90.0)),
            rec(2, "BMW", 2000, Some(300.0)),
        ]);
        let ranked = rank_records(&ds, "engine_hp", Direction::Descending, Some(2)).unwrap();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].id, 2);
        assert_eq!(ranked[1].id, 0);
    }

    #[test]
    fn canned_boards_skip_absent_columns() {
        let ds = EngineDataset::from_records(vec![rec(0, "Ford", 1965, Some(120.0))]);
        let boards = best_engine_boards(&ds, 5);
        assert!(boards.records.contains_key("most_powerful"));
        assert!(!boards.records.contains_key("best_power_density"));
    }
}
