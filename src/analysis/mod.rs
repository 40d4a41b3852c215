/// Analysis layer: everything computed FROM the cleaned dataset.
///
/// ```text
///   EngineDataset (normalized + engineered)
///        │
///        ├──▶ rank      leaderboards, brand medians
///        ├──▶ trend     per-year series
///        └──▶ cluster   standardize → PCA(2) → seeded k-means
/// ```
pub mod cluster;
pub mod rank;
pub mod trend;
