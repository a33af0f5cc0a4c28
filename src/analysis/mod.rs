pub mod matrix;
pub mod pairwise;

pub use matrix::DistanceMatrix;
pub use pairwise::{closest_matches, DistributionKind, PairwiseDistance, PairwiseDistribution};
