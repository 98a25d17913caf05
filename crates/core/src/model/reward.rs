use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::SubjectId;

/// One append-only entry in the reward ledger.
///
/// A subject's running total is always the sum of their entries; readers
/// derive it rather than trusting a separately stored counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardEntry {
    pub subject_id: SubjectId,
    pub points: i64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl RewardEntry {
    #[must_use]
    pub fn new(
        subject_id: SubjectId,
        points: i64,
        reason: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            subject_id,
            points,
            reason: reason.into(),
            created_at,
        }
    }

    /// Entry credited for finishing an instrument, with a reason naming it.
    #[must_use]
    pub fn for_completion(
        subject_id: SubjectId,
        instrument_title: &str,
        points: i64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            subject_id,
            points,
            format!("Completed assessment: {instrument_title}"),
            created_at,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn completion_entry_names_the_instrument() {
        let entry =
            RewardEntry::for_completion(SubjectId::new(1), "Learning styles", 50, fixed_now());
        assert_eq!(entry.points, 50);
        assert_eq!(entry.reason, "Completed assessment: Learning styles");
    }
}
