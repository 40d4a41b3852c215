/// Data layer: core types, loading, cleaning, and filtering.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → RawTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ normalize │  snake_case headers, coerce numerics, drop + count
///   └──────────┘     bad rows, clip outliers → EngineDataset
///        │
///        ▼
///   ┌──────────┐
///   │ features  │  derive displacement, power density, signature,
///   └──────────┘     balanced score → enriched EngineDataset
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  apply facet predicates → filtered indices
///   └──────────┘
/// ```
pub mod features;
pub mod filter;
pub mod loader;
pub mod model;
pub mod normalize;
