pub mod cache;
pub mod config;
pub mod engine;
pub mod memory;

pub use cache::{CacheStats, DistanceCache};
pub use config::{CacheSettings, DistanceConfig, DistanceMetric};
pub use engine::{is_insufficient, INSUFFICIENT_OVERLAP};
pub use memory::{MemoryProbe, MemoryUsage, ProcessMemory};

use log::info;
use parking_lot::RwLock;

use crate::sequence::Sequence;

/// Live distance settings plus the cache of results computed under them.
///
/// Shared by reference (usually behind an `Arc`) between every collection
/// and worker. Changing a setting flushes the cache.
#[derive(Debug, Default)]
pub struct DistanceContext {
    config: RwLock<DistanceConfig>,
    cache: DistanceCache,
}

impl DistanceContext {
    pub fn new(config: DistanceConfig) -> Self {
        Self {
            cache: DistanceCache::new(config.cache),
            config: RwLock::new(config),
        }
    }

    pub fn with_cache(config: DistanceConfig, cache: DistanceCache) -> Self {
        Self {
            config: RwLock::new(config),
            cache,
        }
    }

    /// Snapshot of the current settings.
    pub fn config(&self) -> DistanceConfig {
        *self.config.read()
    }

    pub fn cache(&self) -> &DistanceCache {
        &self.cache
    }

    pub fn minimum_overlap(&self) -> usize {
        self.config.read().minimum_overlap
    }

    pub fn distance_metric(&self) -> DistanceMetric {
        self.config.read().metric
    }

    pub fn ambiguous_bases_allowed(&self) -> bool {
        self.config.read().ambiguous_bases_allowed
    }

    pub fn set_minimum_overlap(&self, minimum_overlap: usize) {
        self.update(|config| config.minimum_overlap = minimum_overlap);
        info!("Minimum overlap set to {minimum_overlap}");
    }

    pub fn set_distance_metric(&self, metric: DistanceMetric) {
        self.update(|config| config.metric = metric);
        info!("Distance metric set to {metric}");
    }

    pub fn set_ambiguous_bases_allowed(&self, allowed: bool) {
        self.update(|config| config.ambiguous_bases_allowed = allowed);
        info!("Ambiguous base matching {}", if allowed { "enabled" } else { "disabled" });
    }

    /// Distance between two sequences, served from the cache when possible.
    pub fn distance(&self, a: &Sequence, b: &Sequence) -> f64 {
        // Read the config inside the closure: the cache records its epoch
        // first, so a concurrent setter always invalidates what we compute.
        self.cache.get_or_compute(a, b, || {
            let config = self.config();
            engine::distance(a.symbols(), b.symbols(), &config)
        })
    }

    pub fn reset_cache(&self) {
        self.cache.invalidate_all();
    }

    /// Drop cached distances for a sequence that is being discarded.
    pub fn forget(&self, sequence: &Sequence) {
        self.cache.remove_sequence(sequence.id());
    }

    fn update<F>(&self, change: F)
    where
        F: FnOnce(&mut DistanceConfig),
    {
        {
            let mut config = self.config.write();
            change(&mut config);
        }
        self.cache.invalidate_all();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;
    use crate::cancel::CancellationToken;

    /// Cancels its token once the cache has served `after` requests.
    struct CancelAfter {
        token: CancellationToken,
        seen: AtomicU64,
        after: u64,
    }

    impl MemoryProbe for CancelAfter {
        fn sample(&self) -> Option<MemoryUsage> {
            if self.seen.fetch_add(1, Ordering::Relaxed) + 1 >= self.after {
                self.token.cancel();
            }
            None
        }
    }

    /// A context that cancels `token` part way through a bulk computation.
    pub(crate) fn cancelling_context(config: DistanceConfig, token: &CancellationToken, after: u64) -> DistanceContext {
        let settings = CacheSettings {
            pressure_check_interval: 1,
            ..config.cache
        };
        let probe = CancelAfter {
            token: token.clone(),
            seen: AtomicU64::new(0),
            after,
        };
        DistanceContext::with_cache(config, DistanceCache::with_probe(settings, Box::new(probe)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_overlap() -> DistanceContext {
        DistanceContext::new(DistanceConfig {
            minimum_overlap: 1,
            ..DistanceConfig::default()
        })
    }

    #[test]
    fn test_metric_change_invalidates() {
        let ctx = small_overlap();
        let a = Sequence::new("Aus bus", "AAAAAAAAAA").unwrap();
        let b = Sequence::new("Aus cus", "GCAAAAAAAA").unwrap();

        let uncorrected = ctx.distance(&a, &b);
        assert!((uncorrected - 0.2).abs() < 1e-12);
        assert_eq!(ctx.cache().get(a.id(), b.id()), Some(uncorrected));

        ctx.set_distance_metric(DistanceMetric::K2P);
        assert_eq!(ctx.cache().get(a.id(), b.id()), None);
        let k2p = ctx.distance(&a, &b);
        assert!(k2p > uncorrected);
    }

    #[test]
    fn test_overlap_change_invalidates() {
        let ctx = small_overlap();
        let a = Sequence::new("Aus bus", "ACGT").unwrap();
        let b = Sequence::new("Aus cus", "ACGT").unwrap();
        assert_eq!(ctx.distance(&a, &b), 0.0);
        ctx.set_minimum_overlap(10);
        assert_eq!(ctx.distance(&a, &b), INSUFFICIENT_OVERLAP);
    }

    #[test]
    fn test_ambiguity_change_invalidates() {
        let ctx = small_overlap();
        let a = Sequence::new("Aus bus", "ACGN").unwrap();
        let b = Sequence::new("Aus cus", "ACGT").unwrap();
        assert_eq!(ctx.distance(&a, &b), 0.0);
        ctx.set_ambiguous_bases_allowed(false);
        assert!((ctx.distance(&a, &b) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_forget() {
        let ctx = small_overlap();
        let a = Sequence::new("Aus bus", "ACGT").unwrap();
        let b = Sequence::new("Aus cus", "ACGT").unwrap();
        ctx.distance(&a, &b);
        ctx.forget(&b);
        assert!(ctx.cache().is_empty());
    }
}
