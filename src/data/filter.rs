use std::collections::BTreeSet;

use super::model::EngineDataset;

// ---------------------------------------------------------------------------
// Filter predicate: the dashboard sidebar as data
// ---------------------------------------------------------------------------

/// Record selection used by the presentation layer before ranking, trend,
/// and cluster calls. An empty set means "no constraint" for that facet,
/// matching a multiselect with nothing picked.
#[derive(Debug, Clone, Default)]
pub struct EngineFilter {
    pub makes: BTreeSet<String>,
    pub engine_types: BTreeSet<String>,
    pub cylinders: BTreeSet<i64>,
    /// Inclusive year range; `None` means all years.
    pub year_range: Option<(i64, i64)>,
}

impl EngineFilter {
    pub fn is_empty(&self) -> bool {
        self.makes.is_empty()
            && self.engine_types.is_empty()
            && self.cylinders.is_empty()
            && self.year_range.is_none()
    }
}

/// Return indices of records that pass all active facets.
///
/// A record passes a facet when:
/// * The facet set is empty → passes (no constraint)
/// * The record's value for that facet is in the selected set → passes
/// * The record is missing the facet's column → fails (it cannot match)
pub fn filtered_indices(dataset: &EngineDataset, filter: &EngineFilter) -> Vec<usize> {
    dataset
        .records
        .iter()
        .enumerate()
        .filter(|(_, rec)| {
            if !filter.makes.is_empty() {
                match rec.text("make") {
                    Some(make) if filter.makes.contains(make) => {}
                    _ => return false,
                }
            }
            if !filter.engine_types.is_empty() {
                match rec.text("engine_type") {
                    Some(et) if filter.engine_types.contains(et) => {}
                    _ => return false,
                }
            }
            if !filter.cylinders.is_empty() {
                match rec.number("number_of_cylinders") {
                    Some(c) if filter.cylinders.contains(&(c as i64)) => {}
                    _ => return false,
                }
            }
            if let Some((lo, hi)) = filter.year_range {
                match rec.number("year") {
                    Some(y) if (y as i64) >= lo && (y as i64) <= hi => {}
                    _ => return false,
                }
            }
            true
        })
        .map(|(i, _)| i)
        .collect()
}

/// Convenience wrapper: a new dataset of the matching records.
pub fn apply_filter(dataset: &EngineDataset, filter: &EngineFilter) -> EngineDataset {
    if filter.is_empty() {
        return dataset.clone();
    }
    dataset.select(&filtered_indices(dataset, filter))
}

// ---------------------------------------------------------------------------
// Facet enumeration (for building filter widgets)
// ---------------------------------------------------------------------------

/// Distinct text values of a column, sorted.
pub fn distinct_text(dataset: &EngineDataset, column: &str) -> Vec<String> {
    let set: BTreeSet<String> = dataset
        .records
        .iter()
        .filter_map(|r| r.text(column))
        .map(str::to_string)
        .collect();
    set.into_iter().collect()
}

/// Distinct integral values of a numeric column, sorted.
pub fn distinct_integers(dataset: &EngineDataset, column: &str) -> Vec<i64> {
    let set: BTreeSet<i64> = dataset
        .records
        .iter()
        .filter_map(|r| r.number(column))
        .map(|v| v as i64)
        .collect();
    set.into_iter().collect()
}

/// (min, max) of the `year` column, `None` when no record has a year.
pub fn year_bounds(dataset: &EngineDataset) -> Option<(i64, i64)> {
    let mut bounds: Option<(i64, i64)> = None;
    for rec in &dataset.records {
        if let Some(y) = rec.number("year") {
            let y = y as i64;
            bounds = Some(match bounds {
                Some((lo, hi)) => (lo.min(y), hi.max(y)),
                None => (y, y),
            });
        }
    }
    bounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{EngineRecord, Value};

    fn dataset() -> EngineDataset {
        let rows = [
            ("Ford", "Gasoline", 4, 1965),
            ("Ford", "Diesel", 6, 1980),
            ("Audi", "Gasoline", 4, 1990),
            ("BMW", "Gasoline", 8, 2001),
        ];
        let records = rows
            .iter()
            .enumerate()
            .map(|(i, (make, et, cyl, year))| {
                let mut rec = EngineRecord::new(i);
                rec.set("make", Value::String(make.to_string()));
                rec.set("engine_type", Value::String(et.to_string()));
                rec.set("number_of_cylinders", Value::Integer(*cyl));
                rec.set("year", Value::Integer(*year));
                rec
            })
            .collect();
        EngineDataset::from_records(records)
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let ds = dataset();
        let filter = EngineFilter::default();
        assert_eq!(filtered_indices(&ds, &filter), vec![0, 1, 2, 3]);
    }

    #[test]
    fn facets_combine_conjunctively() {
        let ds = dataset();
        let mut filter = EngineFilter::default();
        filter.makes.insert("Ford".into());
        filter.engine_types.insert("Gasoline".into());
        assert_eq!(filtered_indices(&ds, &filter), vec![0]);
    }

    #[test]
    fn year_range_is_inclusive() {
        let ds = dataset();
        let filter = EngineFilter {
            year_range: Some((1980, 1990)),
            ..Default::default()
        };
        assert_eq!(filtered_indices(&ds, &filter), vec![1, 2]);
    }

    #[test]
    fn missing_facet_column_fails_active_filter() {
        let mut rec = EngineRecord::new(0);
        rec.set("make", Value::String("Ford".into()));
        let ds = EngineDataset::from_records(vec![rec]);
        let mut filter = EngineFilter::default();
        filter.cylinders.insert(4);
        assert!(filtered_indices(&ds, &filter).is_empty());
    }

    #[test]
    fn facet_helpers_enumerate_sorted() {
        let ds = dataset();
        assert_eq!(distinct_text(&ds, "make"), vec!["Audi", "BMW", "Ford"]);
        assert_eq!(distinct_integers(&ds, "number_of_cylinders"), vec![4, 6, 8]);
        assert_eq!(year_bounds(&ds), Some((1965, 2001)));
    }
}
