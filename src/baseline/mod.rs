// Baseline module - per-dataset reference spectra for normalization
//
// A baseline captures the device/room response of a dataset's reference
// ("control") captures. Subtracting it from a sample's spectral row leaves the
// part of the spectrum the material is responsible for.
//
// Resolution order: cache, legacy summary, control recordings. The first
// non-cache tier that succeeds has its result written to the cache. Results
// (including "no baseline") are memoized for the lifetime of the store, and
// concurrent first requests for one dataset compute it only once.

pub mod sources;

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::analysis::features::SpectralRow;
use crate::config::{AudioConfig, PathsConfig};
pub use sources::{BaselineSource, CacheSource, ControlRecordingSource, LegacySummarySource};

/// Averaged log-magnitude per integer frequency bin
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BaselineSpectrum {
    bins: BTreeMap<i32, f64>,
}

impl BaselineSpectrum {
    pub fn get(&self, bin: i32) -> Option<f64> {
        self.bins.get(&bin).copied()
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, f64)> + '_ {
        self.bins.iter().map(|(&bin, &value)| (bin, value))
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.bins.values().copied()
    }
}

impl From<BTreeMap<i32, f64>> for BaselineSpectrum {
    fn from(bins: BTreeMap<i32, f64>) -> Self {
        Self { bins }
    }
}

/// Subtract `baseline` from `row` bin by bin; bins the baseline lacks count as 0
pub fn subtract(row: &SpectralRow, baseline: &BaselineSpectrum) -> SpectralRow {
    SpectralRow {
        bins: row.bins.clone(),
        values: row
            .iter()
            .map(|(bin, value)| value - baseline.get(bin).unwrap_or(0.0))
            .collect(),
    }
}

/// A dataset id must name one directory: no separators, not `.` or `..`
pub fn is_valid_dataset_id(dataset: &str) -> bool {
    !dataset.is_empty()
        && dataset != "."
        && dataset != ".."
        && !dataset.contains(['/', '\\'])
}

type Resolution = Option<Arc<BaselineSpectrum>>;

/// Memoizing, tiered baseline resolver
pub struct BaselineStore {
    cache: CacheSource,
    tiers: Vec<Box<dyn BaselineSource>>,
    memo: Mutex<HashMap<String, Arc<OnceCell<Resolution>>>>,
    computations: AtomicUsize,
}

impl BaselineStore {
    /// Store with the standard tiers rooted at the configured paths
    pub fn new(paths: &PathsConfig, audio: &AudioConfig) -> Self {
        Self::with_tiers(
            CacheSource::new(&paths.baseline_cache_dir),
            vec![
                Box::new(LegacySummarySource::new(&paths.legacy_summary_dir)),
                Box::new(ControlRecordingSource::new(&paths.data_audio_dir, audio)),
            ],
        )
    }

    /// Store with a cache and an explicit list of fallback tiers
    pub fn with_tiers(cache: CacheSource, tiers: Vec<Box<dyn BaselineSource>>) -> Self {
        Self {
            cache,
            tiers,
            memo: Mutex::new(HashMap::new()),
            computations: AtomicUsize::new(0),
        }
    }

    /// Resolve a dataset's baseline; `None` means "no normalization"
    pub fn resolve(&self, dataset: &str) -> Option<Arc<BaselineSpectrum>> {
        if !is_valid_dataset_id(dataset) {
            tracing::warn!("[BaselineStore] Rejecting dataset id {:?}", dataset);
            return None;
        }
        let cell = {
            let mut memo = self.memo.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(memo.entry(dataset.to_string()).or_default())
        };
        cell.get_or_init(|| self.compute(dataset)).clone()
    }

    /// Number of uncached resolutions performed so far
    pub fn computations(&self) -> usize {
        self.computations.load(Ordering::SeqCst)
    }

    /// Forget a dataset's memoized baseline and delete its cache file
    ///
    /// The next `resolve` recomputes from the remaining tiers.
    pub fn invalidate(&self, dataset: &str) {
        if !is_valid_dataset_id(dataset) {
            return;
        }
        self.memo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(dataset);
        if let Err(err) = self.cache.remove(dataset) {
            tracing::warn!(
                "[BaselineStore] Failed to delete cache for {}: {}",
                dataset,
                err
            );
        }
    }

    fn compute(&self, dataset: &str) -> Resolution {
        self.computations.fetch_add(1, Ordering::SeqCst);

        if let Some(baseline) = self.cache.fetch(dataset) {
            tracing::debug!("[BaselineStore] {} served from cache", dataset);
            return Some(Arc::new(baseline));
        }

        for tier in &self.tiers {
            let Some(baseline) = tier.fetch(dataset) else {
                continue;
            };
            tracing::info!(
                "[BaselineStore] Resolved {} from {} ({} bins)",
                dataset,
                tier.name(),
                baseline.len()
            );
            match self.cache.store(dataset, &baseline) {
                Ok(path) => tracing::debug!("[BaselineStore] Cached at {}", path.display()),
                Err(err) => tracing::warn!(
                    "[BaselineStore] Failed to cache baseline for {}: {}",
                    dataset,
                    err
                ),
            }
            return Some(Arc::new(baseline));
        }

        tracing::info!(
            "[BaselineStore] No baseline for {}; skipping normalization",
            dataset
        );
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    /// Source returning a fixed baseline and counting its calls
    struct CountingSource {
        baseline: Option<BaselineSpectrum>,
        calls: Arc<AtomicUsize>,
        delay: Duration,
    }

    impl BaselineSource for CountingSource {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn fetch(&self, _dataset: &str) -> Option<BaselineSpectrum> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(self.delay);
            self.baseline.clone()
        }
    }

    fn spectrum(pairs: &[(i32, f64)]) -> BaselineSpectrum {
        BaselineSpectrum::from(pairs.iter().copied().collect::<BTreeMap<_, _>>())
    }

    fn store_with(
        dir: &std::path::Path,
        baseline: Option<BaselineSpectrum>,
        delay: Duration,
    ) -> (BaselineStore, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let store = BaselineStore::with_tiers(
            CacheSource::new(dir),
            vec![Box::new(CountingSource {
                baseline,
                calls: Arc::clone(&calls),
                delay,
            })],
        );
        (store, calls)
    }

    #[test]
    fn test_resolve_is_memoized_and_cached() {
        let dir = tempfile::tempdir().unwrap();
        let (store, calls) = store_with(dir.path(), Some(spectrum(&[(1000, 1.5)])), Duration::ZERO);

        let first = store.resolve("lab").unwrap();
        let second = store.resolve("lab").unwrap();
        assert_eq!(first, second);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.computations(), 1);
        assert!(dir.path().join("lab_baseline.json").exists());
    }

    #[test]
    fn test_cache_wins_over_tiers() {
        let dir = tempfile::tempdir().unwrap();
        CacheSource::new(dir.path())
            .store("lab", &spectrum(&[(1000, 9.0)]))
            .unwrap();
        let (store, calls) = store_with(dir.path(), Some(spectrum(&[(1000, 1.5)])), Duration::ZERO);

        assert_eq!(store.resolve("lab").unwrap().get(1000), Some(9.0));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_absent_baseline_is_memoized() {
        let dir = tempfile::tempdir().unwrap();
        let (store, calls) = store_with(dir.path(), None, Duration::ZERO);

        assert!(store.resolve("lab").is_none());
        assert!(store.resolve("lab").is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!dir.path().join("lab_baseline.json").exists());
    }

    #[test]
    fn test_concurrent_first_requests_compute_once() {
        let dir = tempfile::tempdir().unwrap();
        let (store, calls) = store_with(
            dir.path(),
            Some(spectrum(&[(1000, 1.5)])),
            Duration::from_millis(50),
        );
        let store = Arc::new(store);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.resolve("lab"))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let first = results[0].clone().unwrap();
        assert!(results
            .iter()
            .all(|r| Arc::ptr_eq(r.as_ref().unwrap(), &first)));
    }

    #[test]
    fn test_invalidate_forces_recompute() {
        let dir = tempfile::tempdir().unwrap();
        let (store, calls) = store_with(dir.path(), Some(spectrum(&[(1000, 1.5)])), Duration::ZERO);

        store.resolve("lab");
        store.invalidate("lab");
        assert!(!dir.path().join("lab_baseline.json").exists());
        store.resolve("lab");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cache_write_failure_does_not_fail_resolution() {
        let dir = tempfile::tempdir().unwrap();
        // A file where the cache directory should be
        let blocker = dir.path().join("cache");
        std::fs::write(&blocker, b"").unwrap();
        let (store, _) = store_with(&blocker, Some(spectrum(&[(1000, 1.5)])), Duration::ZERO);

        assert_eq!(store.resolve("lab").unwrap().get(1000), Some(1.5));
    }

    #[test]
    fn test_subtract_reindexes_missing_bins_as_zero() {
        let row = SpectralRow {
            bins: vec![1000, 2000],
            values: vec![3.0, 5.0],
        };
        let baseline = spectrum(&[(1000, 1.0), (4000, 7.0)]);
        let normalized = subtract(&row, &baseline);
        assert_eq!(normalized.bins, vec![1000, 2000]);
        assert_eq!(normalized.values, vec![2.0, 5.0]);
    }

    #[test]
    fn test_cache_json_uses_string_keys() {
        let json = serde_json::to_string(&spectrum(&[(1000, 1.5)])).unwrap();
        assert_eq!(json, r#"{"1000":1.5}"#);
        let parsed: BaselineSpectrum = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.get(1000), Some(1.5));
    }

    #[test]
    fn test_path_like_dataset_ids_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join("cache");
        let (store, calls) = store_with(&cache_dir, Some(spectrum(&[(1000, 1.5)])), Duration::ZERO);

        for id in ["../x", "a/b", "a\\b", "..", ".", ""] {
            assert!(store.resolve(id).is_none(), "resolved {id:?}");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.computations(), 0);
        assert!(!dir.path().join("x_baseline.json").exists());

        assert!(is_valid_dataset_id("dataset_1"));
        assert!(is_valid_dataset_id("lab.v2"));
        assert!(store.resolve("dataset_1").is_some());
    }
}
