use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{AssignmentId, InstrumentId, SubjectId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AssignmentError {
    #[error("assignment is already completed")]
    AlreadyCompleted,

    #[error("cannot move assignment from {from} to {to}")]
    InvalidTransition {
        from: AssignmentStatus,
        to: AssignmentStatus,
    },

    #[error("unknown assignment status: {0}")]
    UnknownStatus(String),

    #[error("completed_at is before created_at")]
    InvalidTimeRange,
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Lifecycle of an assignment. Transitions are one-way:
/// `assigned → in_progress → completed`, with `expired` reachable from
/// either non-terminal state. There is no reopening a completed assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Assigned,
    InProgress,
    Completed,
    Expired,
}

impl AssignmentStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Assigned => "assigned",
            AssignmentStatus::InProgress => "in_progress",
            AssignmentStatus::Completed => "completed",
            AssignmentStatus::Expired => "expired",
        }
    }

    /// Parses a persisted status string.
    ///
    /// # Errors
    ///
    /// Returns `AssignmentError::UnknownStatus` for anything else.
    pub fn parse(value: &str) -> Result<Self, AssignmentError> {
        match value {
            "assigned" => Ok(AssignmentStatus::Assigned),
            "in_progress" => Ok(AssignmentStatus::InProgress),
            "completed" => Ok(AssignmentStatus::Completed),
            "expired" => Ok(AssignmentStatus::Expired),
            other => Err(AssignmentError::UnknownStatus(other.to_string())),
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AssignmentStatus::Completed | AssignmentStatus::Expired
        )
    }
}

impl std::fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── ASSIGNMENT ────────────────────────────────────────────────────────────────
//

/// The record that a subject is (or was) working on an instrument.
///
/// At most one assignment per (subject, instrument) may be in progress at a
/// time; the session manager reuses the existing one instead of creating a
/// duplicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    id: AssignmentId,
    subject_id: SubjectId,
    instrument_id: InstrumentId,
    assigned_by: SubjectId,
    status: AssignmentStatus,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl Assignment {
    /// Create an assignment handed out ahead of time (not yet started).
    #[must_use]
    pub fn assigned(
        id: AssignmentId,
        subject_id: SubjectId,
        instrument_id: InstrumentId,
        assigned_by: SubjectId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            subject_id,
            instrument_id,
            assigned_by,
            status: AssignmentStatus::Assigned,
            created_at,
            completed_at: None,
        }
    }

    /// Create an assignment that begins in progress, as happens when the
    /// session manager lazily creates one on the first answer write.
    #[must_use]
    pub fn started(
        id: AssignmentId,
        subject_id: SubjectId,
        instrument_id: InstrumentId,
        assigned_by: SubjectId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            subject_id,
            instrument_id,
            assigned_by,
            status: AssignmentStatus::InProgress,
            created_at,
            completed_at: None,
        }
    }

    /// Rehydrate an assignment from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `AssignmentError::InvalidTimeRange` if `completed_at`
    /// precedes `created_at`.
    pub fn from_persisted(
        id: AssignmentId,
        subject_id: SubjectId,
        instrument_id: InstrumentId,
        assigned_by: SubjectId,
        status: AssignmentStatus,
        created_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, AssignmentError> {
        if let Some(done) = completed_at {
            if done < created_at {
                return Err(AssignmentError::InvalidTimeRange);
            }
        }
        Ok(Self {
            id,
            subject_id,
            instrument_id,
            assigned_by,
            status,
            created_at,
            completed_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> AssignmentId {
        self.id
    }

    #[must_use]
    pub fn subject_id(&self) -> SubjectId {
        self.subject_id
    }

    #[must_use]
    pub fn instrument_id(&self) -> InstrumentId {
        self.instrument_id
    }

    #[must_use]
    pub fn assigned_by(&self) -> SubjectId {
        self.assigned_by
    }

    #[must_use]
    pub fn status(&self) -> AssignmentStatus {
        self.status
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Move an assigned instrument into progress.
    ///
    /// # Errors
    ///
    /// Returns `AssignmentError::InvalidTransition` from any state other
    /// than `Assigned`.
    pub fn start(&mut self) -> Result<(), AssignmentError> {
        match self.status {
            AssignmentStatus::Assigned => {
                self.status = AssignmentStatus::InProgress;
                Ok(())
            }
            from => Err(AssignmentError::InvalidTransition {
                from,
                to: AssignmentStatus::InProgress,
            }),
        }
    }

    /// Close out the assignment. One-way; completing twice is an error.
    ///
    /// # Errors
    ///
    /// Returns `AssignmentError::AlreadyCompleted` if already completed,
    /// or `InvalidTransition` from `Expired`.
    pub fn complete(&mut self, at: DateTime<Utc>) -> Result<(), AssignmentError> {
        match self.status {
            AssignmentStatus::InProgress => {
                self.status = AssignmentStatus::Completed;
                self.completed_at = Some(at);
                Ok(())
            }
            AssignmentStatus::Completed => Err(AssignmentError::AlreadyCompleted),
            from => Err(AssignmentError::InvalidTransition {
                from,
                to: AssignmentStatus::Completed,
            }),
        }
    }

    /// Expire a non-terminal assignment, driven by the external time-based
    /// collaborator.
    ///
    /// # Errors
    ///
    /// Returns `AssignmentError::InvalidTransition` from a terminal state.
    pub fn expire(&mut self) -> Result<(), AssignmentError> {
        match self.status {
            AssignmentStatus::Assigned | AssignmentStatus::InProgress => {
                self.status = AssignmentStatus::Expired;
                Ok(())
            }
            from => Err(AssignmentError::InvalidTransition {
                from,
                to: AssignmentStatus::Expired,
            }),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn build() -> Assignment {
        Assignment::assigned(
            AssignmentId::new(1),
            SubjectId::new(10),
            InstrumentId::new(20),
            SubjectId::new(30),
            fixed_now(),
        )
    }

    #[test]
    fn walks_the_happy_path() {
        let mut a = build();
        assert_eq!(a.status(), AssignmentStatus::Assigned);
        a.start().unwrap();
        assert_eq!(a.status(), AssignmentStatus::InProgress);
        let done = fixed_now() + Duration::minutes(10);
        a.complete(done).unwrap();
        assert_eq!(a.status(), AssignmentStatus::Completed);
        assert_eq!(a.completed_at(), Some(done));
    }

    #[test]
    fn double_completion_is_rejected() {
        let mut a = build();
        a.start().unwrap();
        a.complete(fixed_now()).unwrap();
        let err = a.complete(fixed_now()).unwrap_err();
        assert!(matches!(err, AssignmentError::AlreadyCompleted));
    }

    #[test]
    fn completed_assignment_cannot_expire() {
        let mut a = build();
        a.start().unwrap();
        a.complete(fixed_now()).unwrap();
        let err = a.expire().unwrap_err();
        assert!(matches!(err, AssignmentError::InvalidTransition { .. }));
    }

    #[test]
    fn expiry_is_reachable_from_both_non_terminal_states() {
        let mut fresh = build();
        fresh.expire().unwrap();
        assert_eq!(fresh.status(), AssignmentStatus::Expired);

        let mut started = build();
        started.start().unwrap();
        started.expire().unwrap();
        assert_eq!(started.status(), AssignmentStatus::Expired);
    }

    #[test]
    fn from_persisted_rejects_inverted_times() {
        let err = Assignment::from_persisted(
            AssignmentId::new(1),
            SubjectId::new(10),
            InstrumentId::new(20),
            SubjectId::new(30),
            AssignmentStatus::Completed,
            fixed_now(),
            Some(fixed_now() - Duration::seconds(1)),
        )
        .unwrap_err();
        assert!(matches!(err, AssignmentError::InvalidTimeRange));
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            AssignmentStatus::Assigned,
            AssignmentStatus::InProgress,
            AssignmentStatus::Completed,
            AssignmentStatus::Expired,
        ] {
            assert_eq!(AssignmentStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(AssignmentStatus::parse("paused").is_err());
    }
}
