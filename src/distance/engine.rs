//! Pairwise distance metrics over aligned symbol buffers
//!
//! All functions walk the two buffers position by position up to the
//! shorter length. Which positions count as informative depends on the
//! metric; see [`shared_length`].

use crate::distance::config::{DistanceConfig, DistanceMetric};
use crate::sequence::codec;

/// Returned instead of a distance when two sequences share too few
/// informative positions.
pub const INSUFFICIENT_OVERLAP: f64 = -1.0;

/// Does this distance value mean "not comparable"?
#[inline]
pub fn is_insufficient(distance: f64) -> bool {
    distance < 0.0
}

/// Whether a single aligned position counts towards the shared length.
fn is_informative(ch1: u8, ch2: u8, metric: DistanceMetric) -> bool {
    if codec::is_missing(ch1) || codec::is_missing(ch2) {
        return false;
    }

    if ch1 == codec::EXTERNAL_GAP || ch2 == codec::EXTERNAL_GAP {
        return false;
    }

    // an indel against a base or against another indel
    if codec::is_internal_gap(ch1) || codec::is_internal_gap(ch2) {
        return metric != DistanceMetric::K2P;
    }

    match metric {
        DistanceMetric::Uncorrected => true,
        DistanceMetric::K2P | DistanceMetric::TransversionOnly => {
            codec::is_resolvable(ch1) && codec::is_resolvable(ch2)
        }
    }
}

/// Number of positions informative under `metric`.
///
/// Missing data and external gaps never count. An internal gap, whether
/// against a base or another internal gap, counts except under K2P. Under
/// K2P and transversion-only both bases must resolve to purine or
/// pyrimidine.
pub fn shared_length(a: &[u8], b: &[u8], metric: DistanceMetric) -> usize {
    a.iter()
        .zip(b.iter())
        .filter(|(ch1, ch2)| is_informative(**ch1, **ch2, metric))
        .count()
}

/// Positions where the two symbols match (see [`codec::identical`]).
pub fn count_identical(a: &[u8], b: &[u8], ambiguity_allowed: bool) -> usize {
    a.iter()
        .zip(b.iter())
        .filter(|(ch1, ch2)| codec::identical(**ch1, **ch2, ambiguity_allowed))
        .count()
}

fn is_transversion(ch1: u8, ch2: u8) -> bool {
    codec::is_resolvable(ch1)
        && codec::is_resolvable(ch2)
        && codec::is_purine(ch1) != codec::is_purine(ch2)
}

/// Purine/pyrimidine mismatches between resolvable bases.
pub fn count_transversions(a: &[u8], b: &[u8]) -> usize {
    a.iter()
        .zip(b.iter())
        .filter(|(ch1, ch2)| is_transversion(**ch1, **ch2))
        .count()
}

/// Distance between two buffers under `config`, or [`INSUFFICIENT_OVERLAP`].
pub fn distance(a: &[u8], b: &[u8], config: &DistanceConfig) -> f64 {
    let shared = shared_length(a, b, config.metric);
    if shared < config.minimum_overlap {
        return INSUFFICIENT_OVERLAP;
    }

    match config.metric {
        DistanceMetric::Uncorrected => uncorrected(a, b, shared, config.ambiguous_bases_allowed),
        DistanceMetric::K2P => k2p(a, b),
        DistanceMetric::TransversionOnly => transversion_only(a, b, shared),
    }
}

fn uncorrected(a: &[u8], b: &[u8], shared: usize, ambiguity_allowed: bool) -> f64 {
    if shared == 0 {
        return INSUFFICIENT_OVERLAP;
    }
    let identical = count_identical(a, b, ambiguity_allowed);
    1.0 - identical as f64 / shared as f64
}

fn transversion_only(a: &[u8], b: &[u8], shared: usize) -> f64 {
    if shared == 0 {
        return INSUFFICIENT_OVERLAP;
    }
    count_transversions(a, b) as f64 / shared as f64
}

/// Kimura two-parameter distance.
///
/// Only unequal symbols differ, so `R` against `A` is a transition whatever
/// the ambiguity setting. Falls back to 0 when nothing is comparable or the
/// logarithms are undefined.
fn k2p(a: &[u8], b: &[u8]) -> f64 {
    let mut informative = 0usize;
    let mut transitions = 0usize;
    let mut transversions = 0usize;

    for (&ch1, &ch2) in a.iter().zip(b.iter()) {
        if !is_informative(ch1, ch2, DistanceMetric::K2P) {
            continue;
        }
        informative += 1;

        if ch1 == ch2 {
            continue;
        }
        if codec::is_purine(ch1) == codec::is_purine(ch2) {
            transitions += 1;
        } else {
            transversions += 1;
        }
    }

    if informative == 0 {
        return 0.0;
    }

    let p = transitions as f64 / informative as f64;
    let q = transversions as f64 / informative as f64;

    let w1 = 1.0 - 2.0 * p - q;
    let w2 = 1.0 - 2.0 * q;
    if w1 <= 0.0 || w2 <= 0.0 {
        return 0.0;
    }

    let d = -0.5 * w1.ln() - 0.25 * w2.ln();
    if d > 0.0 {
        d
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(metric: DistanceMetric, minimum_overlap: usize) -> DistanceConfig {
        DistanceConfig {
            metric,
            minimum_overlap,
            ..DistanceConfig::default()
        }
    }

    #[test]
    fn test_shared_length_rules() {
        // base/base, gap/gap, gap/base, ?/base, ext/ext, N/A, ext/base
        let a = b"A--?_N_";
        let b = b"A-AA_AA";
        assert_eq!(shared_length(a, b, DistanceMetric::Uncorrected), 4);
        assert_eq!(shared_length(a, b, DistanceMetric::TransversionOnly), 3);
        assert_eq!(shared_length(a, b, DistanceMetric::K2P), 1);
    }

    #[test]
    fn test_internal_against_external_gap_is_skipped() {
        assert_eq!(shared_length(b"A-", b"A_", DistanceMetric::Uncorrected), 1);
    }

    #[test]
    fn test_indel_counts_as_difference() {
        let a = b"ACGTACGTAC-ACGTACGTAC";
        let b = b"ACGTACGTACAACGTACGTAC";
        assert_eq!(shared_length(a, b, DistanceMetric::Uncorrected), 21);
        assert_eq!(shared_length(a, b, DistanceMetric::TransversionOnly), 21);
        assert_eq!(shared_length(a, b, DistanceMetric::K2P), 20);

        let d = distance(a, b, &config(DistanceMetric::Uncorrected, 1));
        assert!((d - 1.0 / 21.0).abs() < 1e-12);
        assert_eq!(distance(a, b, &config(DistanceMetric::TransversionOnly, 1)), 0.0);
        assert_eq!(distance(a, b, &config(DistanceMetric::K2P, 1)), 0.0);
    }

    #[test]
    fn test_uncorrected() {
        let d = distance(b"ACGTACGTAC", b"ACGTACGTTT", &config(DistanceMetric::Uncorrected, 1));
        assert!((d - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_minimum_overlap_sentinel() {
        let d = distance(b"ACGT", b"ACGT", &config(DistanceMetric::Uncorrected, 5));
        assert_eq!(d, INSUFFICIENT_OVERLAP);
        assert!(is_insufficient(d));
    }

    #[test]
    fn test_transversion_only() {
        // A/C is a transversion, A/G a transition
        let d = distance(b"AAAA", b"ACGA", &config(DistanceMetric::TransversionOnly, 1));
        assert!((d - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_k2p() {
        // 10 positions, one transition, one transversion
        let a = b"AAAAAAAAAA";
        let b = b"GCAAAAAAAA";
        let p: f64 = 0.1;
        let q: f64 = 0.1;
        let expected = -0.5 * (1.0 - 2.0 * p - q).ln() - 0.25 * (1.0 - 2.0 * q).ln();
        let d = distance(a, b, &config(DistanceMetric::K2P, 1));
        assert!((d - expected).abs() < 1e-12);
    }

    #[test]
    fn test_k2p_ambiguous_purine_is_a_transition() {
        let expected = -0.5 * (1.0f64 - 2.0 * 0.1).ln();
        for ambiguous_bases_allowed in [true, false] {
            let config = DistanceConfig {
                ambiguous_bases_allowed,
                ..config(DistanceMetric::K2P, 1)
            };
            let d = distance(b"RAAAAAAAAA", b"AAAAAAAAAA", &config);
            assert!((d - expected).abs() < 1e-12);
            let d = distance(b"YCCCCCCCCC", b"CCCCCCCCCC", &config);
            assert!((d - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_k2p_saturation_clamps_to_zero() {
        let d = distance(b"AAAA", b"GGGG", &config(DistanceMetric::K2P, 1));
        assert_eq!(d, 0.0);
    }

    #[test]
    fn test_k2p_nothing_comparable() {
        assert_eq!(distance(b"NNNN", b"AAAA", &config(DistanceMetric::K2P, 0)), 0.0);
    }

    #[test]
    fn test_identical_and_transversion_counts() {
        assert_eq!(count_identical(b"ACGT-", b"ACCT-", true), 4);
        assert_eq!(count_transversions(b"ACGT", b"CAGC"), 2);
    }
}
