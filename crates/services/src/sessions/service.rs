use std::sync::Arc;

use chrono::{DateTime, Utc};

use assess_core::Clock;
use assess_core::model::{AnswerMap, Instrument, InstrumentCatalog, InstrumentId, SubjectId};
use storage::repository::{
    AnswerRepository, AssignmentRecord, ResponseRecord, ResultRepository, SessionRepository,
    Storage,
};

use super::completion::CompletionService;
use super::view::{InProgressSession, SaveOutcome, StoredResult};
use crate::error::SessionError;

/// The session manager: owns the assignment/response lifecycle and the
/// checkpoint/resume protocol. All reads and writes of session state go
/// through here.
#[derive(Clone)]
pub struct SessionService {
    clock: Clock,
    catalog: Arc<InstrumentCatalog>,
    sessions: Arc<dyn SessionRepository>,
    answers: Arc<dyn AnswerRepository>,
    results: Arc<dyn ResultRepository>,
    completion: CompletionService,
}

impl SessionService {
    #[must_use]
    pub fn new(clock: Clock, catalog: Arc<InstrumentCatalog>, storage: &Storage) -> Self {
        let completion = CompletionService::new(
            clock,
            Arc::clone(&storage.sessions),
            Arc::clone(&storage.results),
            Arc::clone(&storage.rewards),
        );
        Self {
            clock,
            catalog,
            sessions: Arc::clone(&storage.sessions),
            answers: Arc::clone(&storage.answers),
            results: Arc::clone(&storage.results),
            completion,
        }
    }

    fn instrument(&self, id: InstrumentId) -> Result<&Instrument, SessionError> {
        self.catalog
            .get(id)
            .ok_or(SessionError::UnknownInstrument(id))
    }

    /// Look up the unique in-progress session for resume.
    ///
    /// A first-time visitor has no session; that is `Ok(None)`, not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns `UnknownInstrument` for an id outside the catalog, or
    /// `Storage` on persistence failure.
    pub async fn get_in_progress(
        &self,
        subject_id: SubjectId,
        instrument_id: InstrumentId,
    ) -> Result<Option<InProgressSession>, SessionError> {
        let instrument = self.instrument(instrument_id)?;
        let Some((_, response)) = self
            .sessions
            .find_in_progress(subject_id, instrument_id)
            .await?
        else {
            return Ok(None);
        };

        let answers = self.answers.all_for(response.id).await?;
        let last_item_index = answers
            .len()
            .min(instrument.item_count().saturating_sub(1));
        Ok(Some(InProgressSession {
            answers,
            last_item_index,
            started_at: response.started_at,
        }))
    }

    /// Persist a checkpoint: ensure the session exists, then upsert the
    /// full answer set. Autosaves, manual saves, and pre-navigation
    /// checkpoints all go through here and are idempotent.
    ///
    /// # Errors
    ///
    /// Returns `EmptyInput` when no session exists and the batch is empty
    /// (empty state is never created), `UnknownInstrument` for an id
    /// outside the catalog, or `Storage` on persistence failure.
    pub async fn save_progress(
        &self,
        subject_id: SubjectId,
        instrument_id: InstrumentId,
        answers: &AnswerMap,
        started_at: Option<DateTime<Utc>>,
    ) -> Result<SaveOutcome, SessionError> {
        self.instrument(instrument_id)?;
        let (_, response) = self
            .ensure_session(subject_id, instrument_id, answers, started_at)
            .await?;

        let saved = self
            .answers
            .upsert_all(response.id, answers, self.clock.now())
            .await?;
        tracing::debug!(
            subject = %subject_id,
            instrument = %instrument_id,
            response = response.id.value(),
            saved,
            "progress checkpointed"
        );
        Ok(SaveOutcome {
            response_id: response.id,
            saved,
        })
    }

    /// Complete the session: upsert the final answer batch, then hand off
    /// to the completion coordinator for scoring, result persistence, and
    /// the reward.
    ///
    /// # Errors
    ///
    /// Returns `EmptyInput` when there is nothing to complete,
    /// `AlreadyCompleted` when the latest session for the pair already has
    /// a result, `Scoring` when the answers cannot be scored (the session
    /// stays in progress), or `Storage` on persistence failure.
    pub async fn complete(
        &self,
        subject_id: SubjectId,
        instrument_id: InstrumentId,
        answers: &AnswerMap,
        started_at: Option<DateTime<Utc>>,
        ended_at: Option<DateTime<Utc>>,
    ) -> Result<StoredResult, SessionError> {
        let instrument = self.instrument(instrument_id)?;

        let existing = self
            .sessions
            .find_in_progress(subject_id, instrument_id)
            .await?;
        if existing.is_none() {
            if answers.is_empty() {
                return Err(SessionError::EmptyInput);
            }
            // No open session: a prior completion for this pair must not
            // be silently recomputed.
            if self
                .results
                .find_latest(subject_id, instrument_id)
                .await?
                .is_some()
            {
                return Err(SessionError::AlreadyCompleted);
            }
        }
        let (assignment, response) = match existing {
            Some(session) => session,
            None => {
                self.ensure_session(subject_id, instrument_id, answers, started_at)
                    .await?
            }
        };

        self.answers
            .upsert_all(response.id, answers, self.clock.now())
            .await?;
        // Score over everything persisted for the response, not just this
        // final batch, so earlier checkpoints count.
        let full = self.answers.all_for(response.id).await?;

        self.completion
            .finalize(&assignment, &response, instrument, &full, ended_at)
            .await
    }

    /// Latest persisted result for the subject and instrument, if any.
    ///
    /// # Errors
    ///
    /// Returns `UnknownInstrument` for an id outside the catalog, or
    /// `Storage` on persistence failure.
    pub async fn result(
        &self,
        subject_id: SubjectId,
        instrument_id: InstrumentId,
    ) -> Result<Option<StoredResult>, SessionError> {
        self.instrument(instrument_id)?;
        let record = self.results.find_latest(subject_id, instrument_id).await?;
        Ok(record.map(StoredResult::from))
    }

    async fn ensure_session(
        &self,
        subject_id: SubjectId,
        instrument_id: InstrumentId,
        answers: &AnswerMap,
        started_at: Option<DateTime<Utc>>,
    ) -> Result<(AssignmentRecord, ResponseRecord), SessionError> {
        if let Some(existing) = self
            .sessions
            .find_in_progress(subject_id, instrument_id)
            .await?
        {
            return Ok(existing);
        }
        if answers.is_empty() {
            return Err(SessionError::EmptyInput);
        }
        let started = started_at.unwrap_or_else(|| self.clock.now());
        let session = self
            .sessions
            .open_session(subject_id, instrument_id, subject_id, started)
            .await?;
        tracing::info!(
            subject = %subject_id,
            instrument = %instrument_id,
            assignment = session.0.id.value(),
            "session opened"
        );
        Ok(session)
    }
}
