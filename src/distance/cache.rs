//! Identity-keyed, symmetric store of computed distances
//!
//! Keys are unordered pairs of [`SequenceId`]s, stored smaller-first in a
//! single flat map. There is no partial eviction: the whole cache is
//! dropped on request, when memory pressure crosses the configured limit,
//! or when an insert cannot allocate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, trace, warn};
use parking_lot::Mutex;

use crate::distance::config::CacheSettings;
use crate::distance::memory::{MemoryProbe, ProcessMemory};
use crate::sequence::{Sequence, SequenceId};

type PairKey = (SequenceId, SequenceId);

#[inline]
fn canonical(a: SequenceId, b: SequenceId) -> PairKey {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[derive(Debug, Default)]
struct CacheState {
    /// Bumped by every flush. A value computed under an older epoch is not stored.
    epoch: u64,
    entries: HashMap<PairKey, f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub flushes: u64,
}

pub struct DistanceCache {
    state: Mutex<CacheState>,
    probe: Box<dyn MemoryProbe>,
    settings: CacheSettings,
    requests: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    flushes: AtomicU64,
}

impl Default for DistanceCache {
    fn default() -> Self {
        Self::new(CacheSettings::default())
    }
}

impl std::fmt::Debug for DistanceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistanceCache")
            .field("settings", &self.settings)
            .field("stats", &self.stats())
            .finish()
    }
}

impl DistanceCache {
    /// A cache watching this process's resident memory.
    pub fn new(settings: CacheSettings) -> Self {
        Self::with_probe(settings, Box::new(ProcessMemory::new()))
    }

    pub fn with_probe(settings: CacheSettings, probe: Box<dyn MemoryProbe>) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            probe,
            settings,
            requests: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
        }
    }

    pub fn settings(&self) -> CacheSettings {
        self.settings
    }

    pub fn get(&self, a: SequenceId, b: SequenceId) -> Option<f64> {
        self.state.lock().entries.get(&canonical(a, b)).copied()
    }

    pub fn put(&self, a: SequenceId, b: SequenceId, value: f64) {
        let mut state = self.state.lock();
        self.store(&mut state, canonical(a, b), value);
    }

    /// Return the cached distance for the pair, computing and storing it on a miss.
    ///
    /// `compute` runs without the cache lock held. If the cache is flushed
    /// while it runs, the fresh value is still returned but not stored.
    pub fn get_or_compute<F>(&self, a: &Sequence, b: &Sequence, compute: F) -> f64
    where
        F: FnOnce() -> f64,
    {
        self.check_memory_pressure();

        let key = canonical(a.id(), b.id());
        let epoch = {
            let state = self.state.lock();
            if let Some(&value) = state.entries.get(&key) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return value;
            }
            state.epoch
        };
        self.misses.fetch_add(1, Ordering::Relaxed);

        let value = compute();

        let mut state = self.state.lock();
        if state.epoch == epoch {
            self.store(&mut state, key, value);
        } else {
            trace!("Discarding distance for {:?}, cache was flushed mid-computation", key);
        }
        value
    }

    /// Drop every entry.
    pub fn invalidate_all(&self) {
        let mut state = self.state.lock();
        self.flush(&mut state, "explicit reset");
    }

    /// Forget every pair involving `id`. Walks the whole map.
    pub fn remove_sequence(&self, id: SequenceId) {
        let mut state = self.state.lock();
        let before = state.entries.len();
        state.entries.retain(|(a, b), _| *a != id && *b != id);
        trace!("Removed {} cached distances for {}", before - state.entries.len(), id);
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
        }
    }

    fn store(&self, state: &mut CacheState, key: PairKey, value: f64) {
        if state.entries.try_reserve(1).is_err() {
            warn!("Distance cache could not grow past {} entries", state.entries.len());
            self.flush(state, "allocation failure");
            return;
        }
        state.entries.insert(key, value);
    }

    fn flush(&self, state: &mut CacheState, reason: &str) {
        debug!("Flushing distance cache ({} entries): {reason}", state.entries.len());
        state.entries = HashMap::new();
        state.epoch += 1;
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    fn check_memory_pressure(&self) {
        let interval = self.settings.pressure_check_interval.max(1);
        let request = self.requests.fetch_add(1, Ordering::Relaxed);
        if request % interval != 0 {
            return;
        }

        let Some(usage) = self.probe.sample() else {
            return;
        };
        if usage.fraction() > self.settings.memory_limit {
            warn!(
                "Memory usage at {:.1}% exceeds {:.1}%, dropping distance cache",
                usage.fraction() * 100.0,
                self.settings.memory_limit * 100.0
            );
            let mut state = self.state.lock();
            self.flush(&mut state, "memory pressure");
        }
    }
}
