//! Distributions of pairwise distances and best-match queries
//!
//! All entry points lock the shared list for the duration of the
//! computation. The lock is released on every exit path, cancellation
//! included.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

use log::{debug, info};

use crate::cancel::{CancellationToken, Outcome};
use crate::collection::{SharedSequenceList, SortOrder};
use crate::distance::{is_insufficient, DistanceContext};
use crate::sequence::Sequence;

/// Distances closer than this to 0 or 1 count as exactly 0 or 1.
const DISTANCE_TOLERANCE: f64 = 1e-6;

/// Two sequences and the distance between them.
#[derive(Debug, Clone)]
pub struct PairwiseDistance {
    pub a: Arc<Sequence>,
    pub b: Arc<Sequence>,
    pub distance: f64,
}

impl PartialEq for PairwiseDistance {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PairwiseDistance {}

impl PartialOrd for PairwiseDistance {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PairwiseDistance {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance.total_cmp(&other.distance)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DistributionKind {
    /// Pairs within the same species.
    Intraspecific,
    /// Pairs from the same genus but different species.
    Interspecific,
}

/// Sorted distances for every comparable pair of one kind in a list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PairwiseDistribution {
    sequences_examined: usize,
    distances: Vec<f64>,
}

impl PairwiseDistribution {
    /// Each unordered pair is compared once. Pairs that do not overlap
    /// enough are left out.
    pub fn compute(
        list: &SharedSequenceList,
        kind: DistributionKind,
        ctx: &DistanceContext,
        token: &CancellationToken,
    ) -> Outcome<PairwiseDistribution> {
        let guard = list.lock();
        info!("Computing {kind:?} distribution over {} sequences", guard.borrow().len());

        let outcome = match kind {
            DistributionKind::Intraspecific => {
                let mut list = guard.borrow_mut();
                list.resort(SortOrder::ByName);
                let species: BTreeSet<String> = list.iter().filter_map(|s| s.species_name()).collect();

                let mut distances = Vec::new();
                let mut comparisons = 0usize;
                let mut cancelled = false;
                'species: for name in &species {
                    let members: Vec<Arc<Sequence>> = list.conspecific_iterator(name).collect();
                    for (i, query) in members.iter().enumerate() {
                        if token.is_cancelled() {
                            cancelled = true;
                            break 'species;
                        }
                        for other in &members[i + 1..] {
                            comparisons += 1;
                            if token.should_stop(comparisons) {
                                cancelled = true;
                                break 'species;
                            }
                            push_valid(&mut distances, ctx.distance(query, other));
                        }
                    }
                }

                if cancelled {
                    Outcome::Cancelled
                } else {
                    Outcome::Completed((list.len(), distances))
                }
            }
            DistributionKind::Interspecific => {
                let list = guard.borrow();
                let mut distances = Vec::new();
                let mut comparisons = 0usize;
                let mut cancelled = false;
                'query: for (i, query) in list.iter().enumerate() {
                    if token.is_cancelled() {
                        cancelled = true;
                        break;
                    }
                    if query.species_name().is_none() {
                        continue;
                    }
                    for other in &list.as_slice()[i + 1..] {
                        if other.genus() != query.genus()
                            || other.species_name().is_none()
                            || other.taxon().species_epithet() == query.taxon().species_epithet()
                        {
                            continue;
                        }
                        comparisons += 1;
                        if token.should_stop(comparisons) {
                            cancelled = true;
                            break 'query;
                        }
                        push_valid(&mut distances, ctx.distance(query, other));
                    }
                }

                if cancelled {
                    Outcome::Cancelled
                } else {
                    Outcome::Completed((list.len(), distances))
                }
            }
        };

        match outcome {
            Outcome::Completed((sequences_examined, mut distances)) => {
                distances.sort_by(f64::total_cmp);
                debug!("{kind:?} distribution: {} valid comparisons", distances.len());
                Outcome::Completed(PairwiseDistribution {
                    sequences_examined,
                    distances,
                })
            }
            Outcome::Cancelled => {
                info!("{kind:?} distribution cancelled");
                Outcome::Cancelled
            }
        }
    }

    pub fn sequences_examined(&self) -> usize {
        self.sequences_examined
    }

    pub fn valid_comparisons(&self) -> usize {
        self.distances.len()
    }

    /// All distances, ascending.
    pub fn distances(&self) -> &[f64] {
        &self.distances
    }

    pub fn zero_count(&self) -> usize {
        self.distances
            .iter()
            .take_while(|d| d.abs() < DISTANCE_TOLERANCE)
            .count()
    }

    pub fn one_count(&self) -> usize {
        self.distances
            .iter()
            .rev()
            .take_while(|d| (*d - 1.0).abs() < DISTANCE_TOLERANCE)
            .count()
    }

    pub fn minimum(&self) -> Option<f64> {
        self.distances.first().copied()
    }

    pub fn maximum(&self) -> Option<f64> {
        self.distances.last().copied()
    }

    /// Distances with `from <= d <= to`.
    pub fn between_inclusive(&self, from: f64, to: f64) -> usize {
        let lower = self.distances.partition_point(|d| *d < from);
        let upper = self.distances.partition_point(|d| *d <= to);
        upper.saturating_sub(lower)
    }
}

fn push_valid(distances: &mut Vec<f64>, distance: f64) {
    if !is_insufficient(distance) {
        distances.push(distance);
    }
}

/// Every other member of `list` paired with its distance to `query`,
/// closest first. Members that do not overlap enough are left out.
pub fn closest_matches(
    query: &Sequence,
    list: &SharedSequenceList,
    ctx: &DistanceContext,
    token: &CancellationToken,
) -> Outcome<Vec<PairwiseDistance>> {
    let guard = list.lock();
    let list = guard.borrow();
    let query = Arc::new(query.clone());

    let mut matches = Vec::with_capacity(list.len());
    for (i, other) in list.iter().enumerate() {
        if token.should_stop(i) {
            debug!("Best-match search for {} cancelled", query.id());
            return Outcome::Cancelled;
        }
        if other.id() == query.id() {
            continue;
        }
        let distance = ctx.distance(&query, other);
        if is_insufficient(distance) {
            continue;
        }
        matches.push(PairwiseDistance {
            a: Arc::clone(&query),
            b: Arc::clone(other),
            distance,
        });
    }

    matches.sort();
    Outcome::Completed(matches)
}
