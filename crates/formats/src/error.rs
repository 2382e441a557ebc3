use std::path::PathBuf;

use thiserror::Error;

/// The payload is not a usable GeoJSON FeatureCollection.
#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected GeoJSON FeatureCollection")]
    NotAFeatureCollection,
}

/// A dataset source could not produce its payload.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("dataset fetch failed: {0}")]
    Source(#[from] SourceError),
    #[error("dataset parse failed: {0}")]
    Parse(#[from] CollectionError),
}
