use thiserror::Error;

use assess_core::model::InstrumentId;
use assess_core::scoring::ScoringError;
use storage::repository::StorageError;

/// Errors surfaced by the session and completion services.
///
/// All variants are recoverable at the caller. Reads return `Ok(None)` for
/// the no-session steady state; `NotFound` never leaks out of a lookup.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// A save or completion was called with no answers and no existing
    /// session; rejected before any write so empty state is never created.
    #[error("no answers supplied")]
    EmptyInput,

    /// The response already has a result; results are immutable and a
    /// second completion must not recompute or re-award.
    #[error("assessment already completed")]
    AlreadyCompleted,

    /// The instrument id is not in the catalog.
    #[error("unknown instrument: {0}")]
    UnknownInstrument(InstrumentId),

    #[error(transparent)]
    Scoring(#[from] ScoringError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
