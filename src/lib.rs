//! Engine Atlas – analysis pipeline for a car engine specification dataset
//! (1945–2020).
//!
//! The crate cleans a raw tabular export, derives engine features, and hands
//! in-memory tables (rankings, yearly trends, cluster assignments) to
//! whatever presentation layer consumes them. The pipeline is strictly
//! one-directional and stateless:
//!
//! ```text
//! raw file → normalize → features → { rank, trend, cluster } → consumer
//! ```
//!
//! Entry points: [`pipeline::clean_engine_data`] for the cleaning stages,
//! then the `analysis` modules over the resulting
//! [`data::model::EngineDataset`].

pub mod analysis;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod rng;
