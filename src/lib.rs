//! taxondist - pairwise genetic distances for taxonomic DNA analysis
//!
//! Sequences carry IUPAC ambiguity codes and distinguish internal gaps from
//! leading/trailing alignment padding. Distances are computed under an
//! uncorrected, Kimura two-parameter or transversion-only metric and cached
//! per sequence pair in a shared [`DistanceContext`].

pub mod analysis;
pub mod cancel;
pub mod collection;
pub mod distance;
pub mod error;
pub mod logging;
pub mod sequence;

pub use analysis::{DistanceMatrix, PairwiseDistribution};
pub use cancel::{CancellationToken, Outcome};
pub use collection::{SequenceList, SharedSequenceList, SortOrder};
pub use distance::{DistanceCache, DistanceConfig, DistanceContext, DistanceMetric, INSUFFICIENT_OVERLAP};
pub use error::{Result, TaxonError};
pub use sequence::{Sequence, SequenceId};
