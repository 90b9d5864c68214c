use std::path::PathBuf;

use thiserror::Error;

/// Fatal input errors. Data-quality problems (unmatched names, skipped
/// rows) are reported as diagnostics and never show up here.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no {what} column found in {file}")]
    MissingColumn { what: &'static str, file: String },

    #[error("feature collection has no features")]
    EmptyFeatureCollection,

    #[error("malformed feature collection: {0}")]
    MalformedFeatureCollection(String),

    #[error("unparseable date {0:?}")]
    BadDate(String),
}

pub type Result<T> = std::result::Result<T, DataError>;
