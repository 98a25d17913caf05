use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{AssignmentId, ResponseId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResponseError {
    #[error("response is already closed")]
    AlreadyClosed,

    #[error("submitted_at is before started_at")]
    InvalidTimeRange,
}

/// The single attempt at an instrument for one assignment.
///
/// Created lazily by the session manager on the first answer write and
/// closed exactly once at completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    id: ResponseId,
    assignment_id: AssignmentId,
    started_at: DateTime<Utc>,
    submitted_at: Option<DateTime<Utc>>,
}

impl Response {
    /// Open a fresh, in-flight response.
    #[must_use]
    pub fn open(id: ResponseId, assignment_id: AssignmentId, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            assignment_id,
            started_at,
            submitted_at: None,
        }
    }

    /// Rehydrate a response from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `ResponseError::InvalidTimeRange` if `submitted_at` precedes
    /// `started_at`.
    pub fn from_persisted(
        id: ResponseId,
        assignment_id: AssignmentId,
        started_at: DateTime<Utc>,
        submitted_at: Option<DateTime<Utc>>,
    ) -> Result<Self, ResponseError> {
        if let Some(submitted) = submitted_at {
            if submitted < started_at {
                return Err(ResponseError::InvalidTimeRange);
            }
        }
        Ok(Self {
            id,
            assignment_id,
            started_at,
            submitted_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> ResponseId {
        self.id
    }

    #[must_use]
    pub fn assignment_id(&self) -> AssignmentId {
        self.assignment_id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.submitted_at.is_some()
    }

    /// Time spent on the attempt, available once closed. A non-positive
    /// interval yields `None` rather than a negative duration.
    #[must_use]
    pub fn time_spent(&self) -> Option<Duration> {
        let submitted = self.submitted_at?;
        let spent = submitted - self.started_at;
        (spent >= Duration::zero()).then_some(spent)
    }

    /// Close the response. Closing twice is an error; the session manager
    /// rejects double completion before it gets here.
    ///
    /// # Errors
    ///
    /// Returns `ResponseError::AlreadyClosed` if already closed, or
    /// `InvalidTimeRange` if `at` precedes `started_at`.
    pub fn close(&mut self, at: DateTime<Utc>) -> Result<(), ResponseError> {
        if self.is_closed() {
            return Err(ResponseError::AlreadyClosed);
        }
        if at < self.started_at {
            return Err(ResponseError::InvalidTimeRange);
        }
        self.submitted_at = Some(at);
        Ok(())
    }
}
