//! All-against-all distance matrix computed on worker threads.

use std::sync::Arc;
use std::thread;

use log::{debug, info};

use crate::cancel::{CancellationToken, Outcome};
use crate::collection::SharedSequenceList;
use crate::distance::DistanceContext;
use crate::sequence::{Sequence, SequenceId};

/// Symmetric matrix with a zero diagonal, stored as the condensed upper triangle.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    ids: Vec<SequenceId>,
    labels: Vec<String>,
    upper: Vec<f64>,
}

impl DistanceMatrix {
    /// Uses one worker per CPU.
    pub fn compute(
        sequences: &[Arc<Sequence>],
        ctx: &DistanceContext,
        token: &CancellationToken,
    ) -> Outcome<DistanceMatrix> {
        Self::compute_with_workers(sequences, ctx, token, num_cpus::get())
    }

    /// Lock `list` and compute over its current members.
    pub fn for_list(
        list: &SharedSequenceList,
        ctx: &DistanceContext,
        token: &CancellationToken,
    ) -> Outcome<DistanceMatrix> {
        let guard = list.lock();
        let sequences: Vec<Arc<Sequence>> = guard.borrow().iter().cloned().collect();
        Self::compute(&sequences, ctx, token)
    }

    pub fn compute_with_workers(
        sequences: &[Arc<Sequence>],
        ctx: &DistanceContext,
        token: &CancellationToken,
        workers: usize,
    ) -> Outcome<DistanceMatrix> {
        let n = sequences.len();
        let workers = workers.clamp(1, n.max(1));
        info!("Computing {n}x{n} distance matrix on {workers} workers");

        // Rows are dealt out round-robin; early rows are the longest.
        let rows: Vec<Option<Vec<(usize, Vec<f64>)>>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|worker| {
                    scope.spawn(move || {
                        let mut done = Vec::new();
                        let mut comparisons = 0usize;
                        for i in (worker..n).step_by(workers) {
                            if token.is_cancelled() {
                                return None;
                            }
                            let mut row = Vec::with_capacity(n - i - 1);
                            for j in i + 1..n {
                                comparisons += 1;
                                if token.should_stop(comparisons) {
                                    return None;
                                }
                                row.push(ctx.distance(&sequences[i], &sequences[j]));
                            }
                            done.push((i, row));
                        }
                        Some(done)
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                .collect()
        });

        let mut by_row: Vec<Vec<f64>> = vec![Vec::new(); n];
        for worker_rows in rows {
            let Some(worker_rows) = worker_rows else {
                info!("Distance matrix cancelled");
                return Outcome::Cancelled;
            };
            for (i, row) in worker_rows {
                by_row[i] = row;
            }
        }

        let upper: Vec<f64> = by_row.into_iter().flatten().collect();
        debug!("Distance matrix complete, {} pairs", upper.len());

        Outcome::Completed(DistanceMatrix {
            ids: sequences.iter().map(|s| s.id()).collect(),
            labels: sequences.iter().map(|s| s.full_name().to_string()).collect(),
            upper,
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[SequenceId] {
        &self.ids
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Distance between rows `i` and `j`, `None` when out of range.
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        let n = self.len();
        if i >= n || j >= n {
            return None;
        }
        if i == j {
            return Some(0.0);
        }
        let (i, j) = if i < j { (i, j) } else { (j, i) };
        let offset = i * n - i * (i + 1) / 2 + (j - i - 1);
        self.upper.get(offset).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::SequenceList;
    use crate::distance::testing::cancelling_context;
    use crate::distance::{DistanceConfig, INSUFFICIENT_OVERLAP};

    fn ctx() -> DistanceContext {
        DistanceContext::new(DistanceConfig {
            minimum_overlap: 4,
            ..DistanceConfig::default()
        })
    }

    fn sequences() -> Vec<Arc<Sequence>> {
        ["AAAAAAAAAA", "AAAAAAAAAT", "AAAAATTTTT", "TTTTTTTTTT", "AA"]
            .iter()
            .enumerate()
            .map(|(i, bases)| Arc::new(Sequence::new(&format!("Aus s{i}"), bases).unwrap()))
            .collect()
    }

    #[test]
    fn test_matrix_matches_direct_computation() {
        let seqs = sequences();
        let ctx = ctx();
        let config = ctx.config();
        for workers in [1, 3, 8] {
            let matrix = DistanceMatrix::compute_with_workers(&seqs, &ctx, &CancellationToken::new(), workers)
                .completed()
                .unwrap();
            assert_eq!(matrix.len(), 5);
            for i in 0..5 {
                assert_eq!(matrix.get(i, i), Some(0.0));
                for j in 0..5 {
                    if i == j {
                        continue;
                    }
                    let direct = seqs[i].pairwise_distance_uncached(&seqs[j], &config);
                    assert_eq!(matrix.get(i, j), Some(direct));
                    assert_eq!(matrix.get(i, j), matrix.get(j, i));
                }
            }
        }
        assert_eq!(ctx.cache().len(), 10);
    }

    #[test]
    fn test_insufficient_overlap_is_kept() {
        let seqs = sequences();
        let matrix = DistanceMatrix::compute(&seqs, &ctx(), &CancellationToken::new())
            .completed()
            .unwrap();
        assert_eq!(matrix.get(0, 4), Some(INSUFFICIENT_OVERLAP));
        assert_eq!(matrix.get(5, 0), None);
    }

    #[test]
    fn test_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let list = SharedSequenceList::new(SequenceList::from_sequences(sequences()));
        assert!(DistanceMatrix::for_list(&list, &ctx(), &token).is_cancelled());
        assert!(!list.is_locked());
    }

    #[test]
    fn test_cancelled_mid_run() {
        let seqs: Vec<Arc<Sequence>> = (0..60)
            .map(|i| Arc::new(Sequence::new(&format!("Aus s{i}"), "ACGTACGTAC").unwrap()))
            .collect();
        let pairs = 60 * 59 / 2;
        let token = CancellationToken::new();
        let ctx = cancelling_context(ctx().config(), &token, 300);

        let outcome = DistanceMatrix::compute_with_workers(&seqs, &ctx, &token, 1);
        assert!(outcome.is_cancelled());
        let computed = ctx.cache().stats().misses;
        assert!(computed >= 300 && computed < pairs, "{computed} of {pairs}");
    }

    #[test]
    fn test_empty() {
        let matrix = DistanceMatrix::compute(&[], &ctx(), &CancellationToken::new())
            .completed()
            .unwrap();
        assert!(matrix.is_empty());
        assert_eq!(matrix.get(0, 0), None);
    }
}
