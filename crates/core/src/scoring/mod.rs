//! The scoring engine: a pure transformation from raw answers to a
//! normalized result, with one strategy per scoring kind.
//!
//! Nothing here touches storage or the clock; all state is threaded
//! through parameters so scoring is safely callable concurrently for
//! different subjects.

use thiserror::Error;

use crate::model::{
    AnswerMap, Instrument, ItemId, Narrative, ScoredResult, ScoringSpec, TypeTag,
};

mod categorical;
mod dimensional;
mod forced_choice;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScoringError {
    /// Zero answered items for the relevant computation. Completion must
    /// abort without mutating session state so the subject can retry.
    #[error("not enough answered items to score")]
    InsufficientData,

    /// An answer that cannot belong to its item: an option id foreign to
    /// the item, a scale value outside the declared range, or a value of
    /// the wrong shape.
    #[error("invalid answer for item {item}")]
    InvalidValue { item: ItemId },

    /// A direction lookup failed for the winning type. Unreachable for
    /// instruments built through `Instrument::new`, which validates the
    /// maps are total.
    #[error("no declared direction for type {0}")]
    MissingDirection(TypeTag),
}

/// Score a set of answers against an instrument, dispatching on the
/// instrument's declared scoring kind.
///
/// Answers for item ids the instrument does not define are ignored, so a
/// stale client payload cannot fail an otherwise valid completion.
///
/// # Errors
///
/// Returns `ScoringError::InsufficientData` when no usable answers exist,
/// or `ScoringError::InvalidValue` for an answer that contradicts its item.
pub fn score(instrument: &Instrument, answers: &AnswerMap) -> Result<ScoredResult, ScoringError> {
    match instrument.spec() {
        ScoringSpec::Categorical { categories } => {
            categorical::score(instrument, categories, answers)
        }
        ScoringSpec::Likert { range, dimensions } => {
            dimensional::score(instrument, *range, dimensions, answers)
        }
        ScoringSpec::ForcedChoice { types } => forced_choice::score(instrument, types, answers),
    }
}

/// Resolve the static narrative for the winning key; an instrument without
/// feedback for that key yields empty text, not an error.
fn narrative_for(instrument: &Instrument, key: &str) -> Narrative {
    instrument
        .feedback()
        .lookup(key)
        .map(|entry| Narrative {
            strengths: entry.strengths.clone(),
            areas_for_improvement: entry.areas_for_improvement.clone(),
            recommendations: entry.recommendations.clone(),
        })
        .unwrap_or_default()
}

/// Rounds to the nearest integer, halves away from zero, clamped to 0–100.
fn round_percentage(value: f64) -> u8 {
    let rounded = value.round();
    if rounded <= 0.0 {
        0
    } else if rounded >= 100.0 {
        100
    } else {
        // in (0, 100) after the guards above
        rounded as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_goes_half_away_from_zero() {
        assert_eq!(round_percentage(37.5), 38);
        assert_eq!(round_percentage(20.833), 21);
        assert_eq!(round_percentage(16.666), 17);
        assert_eq!(round_percentage(-3.0), 0);
        assert_eq!(round_percentage(104.0), 100);
    }
}
