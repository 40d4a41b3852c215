use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::analysis::cluster::ClusterConfig;
use crate::data::features::add_engine_features;
use crate::data::loader::load_file;
use crate::data::model::EngineDataset;
use crate::data::normalize::{
    clip_outliers, normalize, schema_report, NormalizeReport, SchemaReport,
};
use crate::error::AtlasError;

// ---------------------------------------------------------------------------
// Pipeline façade
// ---------------------------------------------------------------------------

/// Everything a caller can configure: dataset path, clustering (feature
/// list, count, seed), ranking metric and category, leaderboard size. No
/// environment variables, no hidden state.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub dataset_path: PathBuf,
    pub cluster: ClusterConfig,
    pub metric: String,
    pub category: String,
    pub top: usize,
}

impl PipelineConfig {
    pub fn new(dataset_path: impl Into<PathBuf>) -> Self {
        PipelineConfig {
            dataset_path: dataset_path.into(),
            cluster: ClusterConfig::default(),
            metric: "engine_hp".to_string(),
            category: "make".to_string(),
            top: 15,
        }
    }
}

/// Output of one cleaning run: the enriched dataset plus its reports.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub dataset: EngineDataset,
    pub normalize: NormalizeReport,
    pub schema: SchemaReport,
}

/// The whole cleaning pipeline in one call:
/// load → normalize → clip outliers → derive features.
///
/// Stateless and re-runnable; each invocation recomputes everything from the
/// source file. Callers wanting memoization key it on (path, config).
pub fn clean_engine_data(path: &Path) -> Result<PipelineRun, AtlasError> {
    let table = load_file(path)?;
    log::info!("loaded {} raw rows from {}", table.len(), path.display());

    let (dataset, report) = normalize(table);
    let dataset = clip_outliers(dataset);
    let dataset = add_engine_features(dataset);
    let schema = schema_report(&dataset);

    Ok(PipelineRun {
        dataset,
        normalize: report,
        schema,
    })
}

// ---------------------------------------------------------------------------
// Overview stats
// ---------------------------------------------------------------------------

/// Headline numbers for the overview page. Means are over present values
/// only; `None` means "no data", never zero.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryStats {
    pub models: usize,
    pub mean_hp: Option<f64>,
    pub mean_acceleration: Option<f64>,
    pub mean_co2: Option<f64>,
}

pub fn summary_stats(dataset: &EngineDataset) -> SummaryStats {
    let models = crate::data::filter::distinct_text(dataset, "model").len();
    SummaryStats {
        models,
        mean_hp: mean_of(dataset, "engine_hp"),
        mean_acceleration: mean_of(dataset, "acceleration_0_100_km_h_s"),
        mean_co2: mean_of(dataset, "co2_emissions_g_km"),
    }
}

fn mean_of(dataset: &EngineDataset, column: &str) -> Option<f64> {
    let values: Vec<f64> = dataset
        .records
        .iter()
        .filter_map(|r| r.number(column))
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{EngineRecord, Value};

    #[test]
    fn summary_is_missing_aware() {
        let mut a = EngineRecord::new(0);
        a.set("make", Value::String("Ford".into()));
        a.set("model", Value::String("X".into()));
        a.set("engine_hp", Value::Float(100.0));
        let mut b = EngineRecord::new(1);
        b.set("make", Value::String("Ford".into()));
        b.set("model", Value::String("Y".into()));
        b.set("engine_hp", Value::Float(200.0));
        let ds = EngineDataset::from_records(vec![a, b]);

        let stats = summary_stats(&ds);
        assert_eq!(stats.models, 2);
        assert_eq!(stats.mean_hp, Some(150.0));
        assert_eq!(stats.mean_co2, None);
    }

    #[test]
    fn config_defaults_match_dashboard() {
        let cfg = PipelineConfig::new("cars.csv");
        assert_eq!(cfg.metric, "engine_hp");
        assert_eq!(cfg.category, "make");
        assert_eq!(cfg.cluster.k, 4);
        assert_eq!(cfg.cluster.seed, 42);
        assert_eq!(cfg.top, 15);
    }
}
