use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Pipeline error taxonomy
// ---------------------------------------------------------------------------

/// Fatal pipeline errors.
///
/// Recoverable conditions are deliberately NOT represented here: a row that
/// fails normalization is dropped and counted in [`crate::data::normalize::NormalizeReport`],
/// and a feature that cannot be derived stays `Value::Null`. Nothing is ever
/// substituted with a fabricated numeric default.
#[derive(Debug, Error)]
pub enum AtlasError {
    /// The dataset path does not resolve to a readable file.
    #[error("dataset file not found: {}", .path.display())]
    MissingFile { path: PathBuf },

    /// The file extension maps to no known loader.
    #[error("unsupported file extension: .{extension}")]
    UnsupportedFormat { extension: String },

    /// The file exists but its contents could not be parsed.
    #[error("failed to load {}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// A requested metric or category column does not exist in the dataset.
    #[error("unknown column: '{name}'")]
    UnknownColumn { name: String },

    /// Too few rows had all clustering features present.
    #[error(
        "not enough complete rows to cluster: {complete} usable ({excluded} excluded), need at least {required}"
    )]
    ClusterInputInsufficient {
        complete: usize,
        excluded: usize,
        required: usize,
    },
}
