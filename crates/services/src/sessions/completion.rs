use std::sync::Arc;

use chrono::{DateTime, Utc};

use assess_core::Clock;
use assess_core::model::{AnswerMap, Instrument, RewardEntry};
use assess_core::scoring;
use storage::repository::{
    AssignmentRecord, ResponseRecord, ResultRecord, ResultRepository, RewardLedgerRepository,
    SessionRepository, StorageError,
};

use super::view::StoredResult;
use crate::error::SessionError;

/// Points credited for finishing any instrument.
pub const COMPLETION_POINTS: i64 = 50;

/// Sequences the side effects of finishing an instrument exactly once:
/// score, persist the result, close the session, award points.
#[derive(Clone)]
pub struct CompletionService {
    clock: Clock,
    sessions: Arc<dyn SessionRepository>,
    results: Arc<dyn ResultRepository>,
    rewards: Arc<dyn RewardLedgerRepository>,
}

impl CompletionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        sessions: Arc<dyn SessionRepository>,
        results: Arc<dyn ResultRepository>,
        rewards: Arc<dyn RewardLedgerRepository>,
    ) -> Self {
        Self {
            clock,
            sessions,
            results,
            rewards,
        }
    }

    /// Finalize a session whose answers are already persisted.
    ///
    /// Scoring runs first: on `InsufficientData` the whole completion
    /// aborts and the assignment stays in progress, so the subject can
    /// answer more and retry. The result insert is the critical section;
    /// its unique constraint turns a racing second completion into
    /// `AlreadyCompleted` before any state change or reward.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Scoring` when the answers cannot be scored,
    /// `AlreadyCompleted` when a result already exists for the response,
    /// or `Storage` on persistence failure.
    pub async fn finalize(
        &self,
        assignment: &AssignmentRecord,
        response: &ResponseRecord,
        instrument: &Instrument,
        answers: &AnswerMap,
        ended_at: Option<DateTime<Utc>>,
    ) -> Result<StoredResult, SessionError> {
        let scored = scoring::score(instrument, answers)?;
        let submitted_at = ended_at.unwrap_or_else(|| self.clock.now());

        // The session manager already rejects completed sessions; re-check
        // here so a caller holding a stale record cannot double-award.
        if self.results.find_for_response(response.id).await?.is_some() {
            return Err(SessionError::AlreadyCompleted);
        }

        let record = ResultRecord {
            response_id: response.id,
            assignment_id: assignment.id,
            subject_id: assignment.subject_id,
            instrument_id: assignment.instrument_id,
            breakdown: scored.breakdown,
            strengths: scored.narrative.strengths,
            areas_for_improvement: scored.narrative.areas_for_improvement,
            recommendations: scored.narrative.recommendations,
            analyzed: false,
            mentor_feedback: None,
            created_at: submitted_at,
        };
        match self.results.insert(record.clone()).await {
            Ok(()) => {}
            Err(StorageError::Conflict) => return Err(SessionError::AlreadyCompleted),
            Err(e) => return Err(e.into()),
        }

        match self
            .sessions
            .mark_completed(assignment.id, response.id, submitted_at)
            .await
        {
            Ok(()) | Err(StorageError::Conflict) => {}
            Err(e) => return Err(e.into()),
        }

        let time_spent = (submitted_at - response.started_at).num_seconds();
        tracing::info!(
            assignment = assignment.id.value(),
            response = response.id.value(),
            instrument = %assignment.instrument_id,
            time_spent_secs = if time_spent > 0 { Some(time_spent) } else { None },
            "assessment completed"
        );

        let entry = RewardEntry::for_completion(
            assignment.subject_id,
            instrument.title(),
            COMPLETION_POINTS,
            submitted_at,
        );
        self.rewards.append(entry).await?;
        tracing::info!(
            subject = %assignment.subject_id,
            points = COMPLETION_POINTS,
            "reward credited"
        );

        Ok(record.into())
    }
}
