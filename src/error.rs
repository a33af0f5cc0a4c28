//! Error types shared by every part of the crate.

use thiserror::Error;

/// Everything that can go wrong inside the distance core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaxonError {
    /// An invalid character, or a reserved marker, was found while building a sequence.
    #[error("malformed sequence '{name}' at index {index}: {detail}")]
    MalformedSequence {
        name: String,
        index: usize,
        detail: String,
    },

    /// The requested coordinates start before the first base or run too far
    /// past the end to pad.
    #[error("there is no subsequence at ({from}, {to})")]
    NoSuchSubsequence { from: usize, to: usize },

    /// A bulk computation was stopped through its cancellation token.
    #[error("computation cancelled")]
    ComputationCancelled,

    /// Internal consistency failure. Always a programming error.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Misuse of a cursor, e.g. removing twice without advancing.
    #[error("illegal iterator state: {0}")]
    IteratorState(String),

    #[error("invalid value '{value}' for {key}")]
    InvalidConfig { key: String, value: String },
}

pub type Result<T> = std::result::Result<T, TaxonError>;

impl TaxonError {
    pub(crate) fn malformed(name: &str, index: usize, detail: impl Into<String>) -> Self {
        TaxonError::MalformedSequence {
            name: name.to_string(),
            index,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_message_names_the_index() {
        let err = TaxonError::malformed("Aus bus", 7, "illegal base 'X'");
        assert_eq!(
            err.to_string(),
            "malformed sequence 'Aus bus' at index 7: illegal base 'X'"
        );
    }

    #[test]
    fn test_cancelled_is_comparable() {
        assert_eq!(TaxonError::ComputationCancelled, TaxonError::ComputationCancelled);
    }
}
