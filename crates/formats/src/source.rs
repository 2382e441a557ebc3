use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SourceError;

/// Where a country dataset comes from.
///
/// Implementations fetch the raw GeoJSON payload; parsing and caching live in
/// [`crate::FeatureCache`].
pub trait FeatureSource {
    /// Human-readable origin for logs.
    fn describe(&self) -> String;

    fn fetch(&self) -> Result<String, SourceError>;
}

/// Reads the dataset from a local file.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FeatureSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> Result<String, SourceError> {
        fs::read_to_string(&self.path).map_err(|source| SourceError::Io {
            path: self.path.clone(),
            source,
        })
    }
}
