use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use engine_atlas::analysis::cluster::{compute_clusters, ClusterAssignment};
use engine_atlas::analysis::rank::{
    best_engine_boards, brand_battle_boards, rank_groups, rank_records, Aggregate, Direction,
    GroupRank, RankedRecord, RankingTable,
};
use engine_atlas::analysis::trend::{trend_by_year, TrendPoint};
use engine_atlas::data::filter::{apply_filter, year_bounds, EngineFilter};
use engine_atlas::data::normalize::{NormalizeReport, SchemaReport};
use engine_atlas::error::AtlasError;
use engine_atlas::pipeline::{clean_engine_data, summary_stats, PipelineConfig, SummaryStats};

/// Clean the engine dataset and print the derived tables.
#[derive(Parser)]
#[command(name = "engine-atlas", version, about)]
struct Args {
    /// Dataset file (.csv, .json, or .parquet)
    dataset: PathBuf,

    /// Metric column for the custom ranking
    #[arg(long, default_value = "engine_hp")]
    metric: String,

    /// Category column for the custom group ranking
    #[arg(long, default_value = "make")]
    by: String,

    /// Rank the custom metric ascending (lower is better)
    #[arg(long)]
    ascending: bool,

    /// Number of k-means clusters
    #[arg(long, default_value_t = 4)]
    clusters: usize,

    /// Random seed for clustering
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Rows per leaderboard
    #[arg(long, default_value_t = 15)]
    top: usize,

    /// Restrict to these makes (repeatable)
    #[arg(long = "make")]
    makes: Vec<String>,

    /// Inclusive year range start
    #[arg(long)]
    year_from: Option<i64>,

    /// Inclusive year range end
    #[arg(long)]
    year_to: Option<i64>,

    /// Emit the full report as JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Report {
    normalize: NormalizeReport,
    schema: SchemaReport,
    summary: SummaryStats,
    best_engines: RankingTable,
    brand_battles: RankingTable,
    custom_ranking: Vec<RankedRecord>,
    custom_groups: Vec<GroupRank>,
    trend: Vec<TrendPoint>,
    clusters: Option<ClusterAssignment>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = pipeline_config(&args);

    let run = clean_engine_data(&config.dataset_path)
        .with_context(|| format!("processing {}", config.dataset_path.display()))?;

    let filter = build_filter(&args, &run.dataset)?;
    let dataset = apply_filter(&run.dataset, &filter);

    let direction = if args.ascending {
        Direction::Ascending
    } else {
        Direction::Descending
    };
    let custom_ranking = rank_records(&dataset, &config.metric, direction, Some(config.top))?;
    let custom_groups = rank_groups(
        &dataset,
        &config.category,
        &config.metric,
        Aggregate::Median,
        direction,
        Some(config.top),
    )?;
    let trend = trend_by_year(&dataset, &config.metric, Aggregate::Mean)?;

    let clusters = match compute_clusters(&dataset, &config.cluster) {
        Ok(c) => Some(c),
        Err(err @ AtlasError::ClusterInputInsufficient { .. }) => {
            log::warn!("{err}");
            None
        }
        Err(err) => return Err(err.into()),
    };

    let report = Report {
        normalize: run.normalize,
        schema: run.schema,
        summary: summary_stats(&dataset),
        best_engines: best_engine_boards(&dataset, config.top),
        brand_battles: brand_battle_boards(&dataset, config.top),
        custom_ranking,
        custom_groups,
        trend,
        clusters,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&config, &report);
    }
    Ok(())
}

fn pipeline_config(args: &Args) -> PipelineConfig {
    let mut config = PipelineConfig::new(&args.dataset);
    config.metric = args.metric.clone();
    config.category = args.by.clone();
    config.top = args.top;
    config.cluster.k = args.clusters;
    config.cluster.min_rows = args.clusters;
    config.cluster.seed = args.seed;
    config
}

fn build_filter(args: &Args, dataset: &engine_atlas::data::model::EngineDataset) -> Result<EngineFilter> {
    let mut filter = EngineFilter::default();
    filter.makes = args.makes.iter().cloned().collect();
    if args.year_from.is_some() || args.year_to.is_some() {
        let (min_year, max_year) =
            year_bounds(dataset).context("dataset has no usable year column")?;
        filter.year_range = Some((
            args.year_from.unwrap_or(min_year),
            args.year_to.unwrap_or(max_year),
        ));
    }
    Ok(filter)
}

// ---------------------------------------------------------------------------
// Text report
// ---------------------------------------------------------------------------

fn print_report(config: &PipelineConfig, report: &Report) {
    println!(
        "Rows: {} in, {} kept, {} dropped without identity",
        report.normalize.rows_in, report.normalize.rows_out, report.normalize.dropped_rows
    );

    println!("\nMost-missing columns:");
    for (col, missing) in report.schema.missing_by_col.iter().take(8) {
        println!("  {col:<40} {missing} missing");
    }

    let s = &report.summary;
    println!("\nOverview: {} models", s.models);
    println!("  avg HP    {}", fmt_opt(s.mean_hp, ""));
    println!("  avg 0-100 {}", fmt_opt(s.mean_acceleration, " s"));
    println!("  avg CO2   {}", fmt_opt(s.mean_co2, " g/km"));

    for (label, entries) in &report.best_engines.records {
        print_ranked(label, entries);
    }
    for (label, entries) in &report.brand_battles.groups {
        print_groups(label, entries);
    }

    print_ranked(
        &format!("Top {} by {}", config.top, config.metric),
        &report.custom_ranking,
    );
    print_groups(
        &format!("Median {} by {}", config.metric, config.category),
        &report.custom_groups,
    );

    if !report.trend.is_empty() {
        println!("\nMean {} by year:", config.metric);
        for point in &report.trend {
            println!("  {}  {:>8.1}  ({} rows)", point.year, point.value, point.count);
        }
    }

    match &report.clusters {
        Some(clusters) => {
            println!(
                "\nClusters ({} records, {} excluded for missing features):",
                clusters.assignments.len(),
                clusters.excluded
            );
            for summary in &clusters.summaries {
                print!("  [{}] {:<12} {:>4} records |", summary.cluster, summary.name, summary.size);
                for (feature, mean) in &summary.feature_means {
                    print!("  {feature}={mean:.1}");
                }
                println!();
            }
        }
        None => println!("\nClusters: not enough complete rows for the current filters."),
    }
}

fn print_ranked(label: &str, entries: &[RankedRecord]) {
    if entries.is_empty() {
        return;
    }
    println!("\n{label}:");
    for (pos, entry) in entries.iter().enumerate() {
        println!("  {:>2}. {:<48} {:>10.2}", pos + 1, entry.label, entry.value);
    }
}

fn print_groups(label: &str, entries: &[GroupRank]) {
    if entries.is_empty() {
        return;
    }
    println!("\n{label}:");
    for (pos, entry) in entries.iter().enumerate() {
        println!(
            "  {:>2}. {:<32} {:>10.2}  ({} rows)",
            pos + 1,
            entry.key,
            entry.value,
            entry.size
        );
    }
}

fn fmt_opt(value: Option<f64>, suffix: &str) -> String {
    match value {
        Some(v) => format!("{v:.1}{suffix}"),
        None => "N/A".to_string(),
    }
}
