//! Tri-state result of a single detector or analyzer check.
//!
//! Insufficient data is [`CheckOutcome::NoSignal`], never an error.

use crate::evidence::CheatDetection;

/// Outcome of one check. `E` is the evidence the check produces.
#[derive(Clone, Debug, PartialEq)]
pub enum CheckOutcome<E = CheatDetection> {
    /// Not enough data to judge (first sample, zero time delta, no oracle
    /// signal, too few samples in the window).
    NoSignal,
    /// Enough data, nothing suspicious.
    Clear,
    /// The check fired.
    Flagged(E),
}

impl<E> CheckOutcome<E> {
    /// `Flagged` if `fired`, otherwise `Clear`. The evidence is built lazily.
    pub fn flag_if(fired: bool, evidence: impl FnOnce() -> E) -> Self {
        if fired {
            Self::Flagged(evidence())
        } else {
            Self::Clear
        }
    }

    /// Returns true if the check fired.
    #[must_use]
    pub const fn is_flagged(&self) -> bool {
        matches!(self, Self::Flagged(_))
    }

    /// Returns true if the check had enough data to judge.
    #[must_use]
    pub const fn has_signal(&self) -> bool {
        !matches!(self, Self::NoSignal)
    }

    /// The evidence, if the check fired.
    #[must_use]
    pub fn into_evidence(self) -> Option<E> {
        match self {
            Self::Flagged(evidence) => Some(evidence),
            Self::NoSignal | Self::Clear => None,
        }
    }
}

/// Collects the evidence of every flagged outcome.
pub fn collect_flagged<E>(outcomes: impl IntoIterator<Item = CheckOutcome<E>>) -> Vec<E> {
    outcomes
        .into_iter()
        .filter_map(CheckOutcome::into_evidence)
        .collect()
}
