use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, warn};

use crate::countries::CountryCollection;
use crate::error::LoadError;
use crate::source::FeatureSource;

/// Load-once cache in front of a [`FeatureSource`].
///
/// Lifecycle:
/// - The first successful [`FeatureCache::get`] fetches, parses, and keeps the collection.
/// - A failed fetch or parse keeps nothing, so the next call retries from scratch.
/// - [`FeatureCache::invalidate`] drops a cached collection explicitly.
#[derive(Debug)]
pub struct FeatureCache<S> {
    source: S,
    cell: OnceCell<Arc<CountryCollection>>,
}

impl<S: FeatureSource> FeatureCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cell: OnceCell::new(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn get(&self) -> Result<Arc<CountryCollection>, LoadError> {
        self.cell
            .get_or_try_init(|| {
                let origin = self.source.describe();
                let payload = self.source.fetch()?;
                let collection = CountryCollection::from_geojson_str(&payload)?;
                debug!(%origin, features = collection.len(), "country dataset loaded");
                Ok::<_, LoadError>(Arc::new(collection))
            })
            .map(Arc::clone)
            .inspect_err(|e| {
                warn!(origin = %self.source.describe(), error = %e, "country dataset load failed");
            })
    }

    pub fn invalidate(&mut self) {
        self.cell.take();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::sync::Arc;

    use super::FeatureCache;
    use crate::error::{LoadError, SourceError};
    use crate::source::{FeatureSource, FileSource};

    const EMPTY_COLLECTION: &str = r#"{"type": "FeatureCollection", "features": []}"#;

    /// Fails the first `failures` fetches, then serves a fixed payload.
    struct FlakySource {
        failures: Cell<u32>,
        fetches: Cell<u32>,
        payload: &'static str,
    }

    impl FlakySource {
        fn new(failures: u32, payload: &'static str) -> Self {
            Self {
                failures: Cell::new(failures),
                fetches: Cell::new(0),
                payload,
            }
        }
    }

    impl FeatureSource for FlakySource {
        fn describe(&self) -> String {
            "flaky".to_string()
        }

        fn fetch(&self) -> Result<String, SourceError> {
            self.fetches.set(self.fetches.get() + 1);
            if self.failures.get() > 0 {
                self.failures.set(self.failures.get() - 1);
                return Err(SourceError::Unavailable("offline".to_string()));
            }
            Ok(self.payload.to_string())
        }
    }

    #[test]
    fn failure_is_propagated_and_retried() {
        let cache = FeatureCache::new(FlakySource::new(1, EMPTY_COLLECTION));
        assert!(matches!(cache.get(), Err(LoadError::Source(_))));
        assert!(!cache.is_loaded());

        let loaded = cache.get().expect("second attempt succeeds");
        assert!(loaded.is_empty());
        assert!(cache.is_loaded());
        assert_eq!(cache.source().fetches.get(), 2);
    }

    #[test]
    fn success_is_fetched_once() {
        let cache = FeatureCache::new(FlakySource::new(0, EMPTY_COLLECTION));
        let a = cache.get().expect("load");
        let b = cache.get().expect("load");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.source().fetches.get(), 1);
    }

    #[test]
    fn parse_failure_leaves_cache_empty() {
        let cache = FeatureCache::new(FlakySource::new(0, "[1, 2, 3]"));
        assert!(matches!(cache.get(), Err(LoadError::Parse(_))));
        assert!(!cache.is_loaded());
        assert!(cache.get().is_err());
        assert_eq!(cache.source().fetches.get(), 2);
    }

    #[test]
    fn invalidate_forces_refetch() {
        let mut cache = FeatureCache::new(FlakySource::new(0, EMPTY_COLLECTION));
        cache.get().expect("load");
        cache.invalidate();
        assert!(!cache.is_loaded());
        cache.get().expect("reload");
        assert_eq!(cache.source().fetches.get(), 2);
    }

    #[test]
    fn loads_sample_asset_from_disk() {
        let path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("assets/countries_sample.geojson");
        let cache = FeatureCache::new(FileSource::new(path));
        let collection = cache.get().expect("load sample");
        assert!(!collection.is_empty());
    }
}
