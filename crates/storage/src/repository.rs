use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use assess_core::model::{
    AnswerMap, AnswerValue, Assignment, AssignmentError, AssignmentId, AssignmentStatus,
    InstrumentId, ItemId, Response, ResponseError, ResponseId, RewardEntry, ScoreBreakdown,
    SubjectId,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Persisted shape for an assignment.
///
/// Mirrors the domain `Assignment` so repositories can serialize without
/// leaking storage concerns into the domain layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentRecord {
    pub id: AssignmentId,
    pub subject_id: SubjectId,
    pub instrument_id: InstrumentId,
    pub assigned_by: SubjectId,
    pub status: AssignmentStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl AssignmentRecord {
    #[must_use]
    pub fn from_assignment(assignment: &Assignment) -> Self {
        Self {
            id: assignment.id(),
            subject_id: assignment.subject_id(),
            instrument_id: assignment.instrument_id(),
            assigned_by: assignment.assigned_by(),
            status: assignment.status(),
            created_at: assignment.created_at(),
            completed_at: assignment.completed_at(),
        }
    }

    /// Convert the record back into a domain `Assignment`.
    ///
    /// # Errors
    ///
    /// Returns `AssignmentError` if the persisted timestamps are inconsistent.
    pub fn into_assignment(self) -> Result<Assignment, AssignmentError> {
        Assignment::from_persisted(
            self.id,
            self.subject_id,
            self.instrument_id,
            self.assigned_by,
            self.status,
            self.created_at,
            self.completed_at,
        )
    }
}

/// Persisted shape for a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRecord {
    pub id: ResponseId,
    pub assignment_id: AssignmentId,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl ResponseRecord {
    #[must_use]
    pub fn from_response(response: &Response) -> Self {
        Self {
            id: response.id(),
            assignment_id: response.assignment_id(),
            started_at: response.started_at(),
            submitted_at: response.submitted_at(),
        }
    }

    /// Convert the record back into a domain `Response`.
    ///
    /// # Errors
    ///
    /// Returns `ResponseError` if the persisted timestamps are inconsistent.
    pub fn into_response(self) -> Result<Response, ResponseError> {
        Response::from_persisted(self.id, self.assignment_id, self.started_at, self.submitted_at)
    }
}

/// One stored answer row, including its write timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRow {
    pub item_id: ItemId,
    pub value: AnswerValue,
    pub answered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Persisted shape for a finalized result. Created once per response at
/// completion; the scoring path never mutates it afterward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRecord {
    pub response_id: ResponseId,
    pub assignment_id: AssignmentId,
    pub subject_id: SubjectId,
    pub instrument_id: InstrumentId,
    pub breakdown: ScoreBreakdown,
    pub strengths: String,
    pub areas_for_improvement: String,
    pub recommendations: String,
    /// Extension point for the human-review feature; false on creation.
    pub analyzed: bool,
    pub mentor_feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

//
// ─── REPOSITORY CONTRACTS ──────────────────────────────────────────────────────
//

/// Repository contract for assignment + response session state.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Look up the unique in-progress session for a subject and instrument.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure; an absent session is
    /// `Ok(None)`, not an error.
    async fn find_in_progress(
        &self,
        subject_id: SubjectId,
        instrument_id: InstrumentId,
    ) -> Result<Option<(AssignmentRecord, ResponseRecord)>, StorageError>;

    /// Return the in-progress session for the pair, creating the assignment
    /// and its response when none exists. Reuse-or-create is atomic: two
    /// racing calls converge on one session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the session cannot be stored.
    async fn open_session(
        &self,
        subject_id: SubjectId,
        instrument_id: InstrumentId,
        assigned_by: SubjectId,
        started_at: DateTime<Utc>,
    ) -> Result<(AssignmentRecord, ResponseRecord), StorageError>;

    /// Transition the assignment to completed and close its response.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the assignment is already in a
    /// terminal state, `NotFound` if it does not exist.
    async fn mark_completed(
        &self,
        assignment_id: AssignmentId,
        response_id: ResponseId,
        submitted_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Expire a non-terminal assignment (driven by an external collaborator).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` for terminal assignments, `NotFound`
    /// if missing.
    async fn mark_expired(&self, assignment_id: AssignmentId) -> Result<(), StorageError>;
}

/// Repository contract for per-item answers.
#[async_trait]
pub trait AnswerRepository: Send + Sync {
    /// Insert or overwrite every (item, value) pair for the response.
    ///
    /// Existing rows keep their `answered_at` and get a fresh `updated_at`;
    /// new rows get both set to `now`. Repeated calls with identical data
    /// are tolerated (no duplicates, no error). Returns the number of pairs
    /// written.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the answers cannot be stored.
    async fn upsert_all(
        &self,
        response_id: ResponseId,
        answers: &AnswerMap,
        now: DateTime<Utc>,
    ) -> Result<u32, StorageError>;

    /// Reconstruct the answer map for resume; empty map when nothing is
    /// stored yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn all_for(&self, response_id: ResponseId) -> Result<AnswerMap, StorageError>;

    /// Full rows including timestamps, ordered by item id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn rows_for(&self, response_id: ResponseId) -> Result<Vec<AnswerRow>, StorageError>;
}

/// Repository contract for finalized results.
#[async_trait]
pub trait ResultRepository: Send + Sync {
    /// Persist a result. At most one result may exist per response; this is
    /// the critical section that keeps racing completions from
    /// double-awarding.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a result already exists for the
    /// response.
    async fn insert(&self, record: ResultRecord) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn find_for_response(
        &self,
        response_id: ResponseId,
    ) -> Result<Option<ResultRecord>, StorageError>;

    /// Most recent result for the subject and instrument, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn find_latest(
        &self,
        subject_id: SubjectId,
        instrument_id: InstrumentId,
    ) -> Result<Option<ResultRecord>, StorageError>;
}

/// Repository contract for the append-only reward ledger.
#[async_trait]
pub trait RewardLedgerRepository: Send + Sync {
    /// Append one entry; returns its row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the entry cannot be stored.
    async fn append(&self, entry: RewardEntry) -> Result<i64, StorageError>;

    /// Running total for a subject, always the sum of their entries.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn total_for(&self, subject_id: SubjectId) -> Result<i64, StorageError>;

    /// All entries for a subject in append order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn entries_for(&self, subject_id: SubjectId) -> Result<Vec<RewardEntry>, StorageError>;
}

//
// ─── IN-MEMORY IMPLEMENTATION ──────────────────────────────────────────────────
//

#[derive(Default)]
struct InMemoryState {
    next_assignment_id: i64,
    next_response_id: i64,
    assignments: HashMap<AssignmentId, AssignmentRecord>,
    responses: HashMap<ResponseId, ResponseRecord>,
    answers: HashMap<(ResponseId, ItemId), AnswerRow>,
    results: HashMap<ResponseId, ResultRecord>,
    ledger: Vec<RewardEntry>,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, InMemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

fn find_in_progress_locked(
    state: &InMemoryState,
    subject_id: SubjectId,
    instrument_id: InstrumentId,
) -> Option<(AssignmentRecord, ResponseRecord)> {
    let assignment = state.assignments.values().find(|a| {
        a.subject_id == subject_id
            && a.instrument_id == instrument_id
            && a.status == AssignmentStatus::InProgress
    })?;
    let response = state
        .responses
        .values()
        .find(|r| r.assignment_id == assignment.id)?;
    Some((assignment.clone(), response.clone()))
}

#[async_trait]
impl SessionRepository for InMemoryRepository {
    async fn find_in_progress(
        &self,
        subject_id: SubjectId,
        instrument_id: InstrumentId,
    ) -> Result<Option<(AssignmentRecord, ResponseRecord)>, StorageError> {
        let state = self.lock()?;
        Ok(find_in_progress_locked(&state, subject_id, instrument_id))
    }

    async fn open_session(
        &self,
        subject_id: SubjectId,
        instrument_id: InstrumentId,
        assigned_by: SubjectId,
        started_at: DateTime<Utc>,
    ) -> Result<(AssignmentRecord, ResponseRecord), StorageError> {
        let mut state = self.lock()?;
        if let Some(existing) = find_in_progress_locked(&state, subject_id, instrument_id) {
            return Ok(existing);
        }

        state.next_assignment_id += 1;
        let assignment = AssignmentRecord {
            id: AssignmentId::new(state.next_assignment_id),
            subject_id,
            instrument_id,
            assigned_by,
            status: AssignmentStatus::InProgress,
            created_at: started_at,
            completed_at: None,
        };
        state.next_response_id += 1;
        let response = ResponseRecord {
            id: ResponseId::new(state.next_response_id),
            assignment_id: assignment.id,
            started_at,
            submitted_at: None,
        };
        state.assignments.insert(assignment.id, assignment.clone());
        state.responses.insert(response.id, response.clone());
        Ok((assignment, response))
    }

    async fn mark_completed(
        &self,
        assignment_id: AssignmentId,
        response_id: ResponseId,
        submitted_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let assignment = state
            .assignments
            .get_mut(&assignment_id)
            .ok_or(StorageError::NotFound)?;
        if assignment.status.is_terminal() {
            return Err(StorageError::Conflict);
        }
        assignment.status = AssignmentStatus::Completed;
        assignment.completed_at = Some(submitted_at);

        let response = state
            .responses
            .get_mut(&response_id)
            .ok_or(StorageError::NotFound)?;
        if response.submitted_at.is_none() {
            response.submitted_at = Some(submitted_at);
        }
        Ok(())
    }

    async fn mark_expired(&self, assignment_id: AssignmentId) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let assignment = state
            .assignments
            .get_mut(&assignment_id)
            .ok_or(StorageError::NotFound)?;
        if assignment.status.is_terminal() {
            return Err(StorageError::Conflict);
        }
        assignment.status = AssignmentStatus::Expired;
        Ok(())
    }
}

#[async_trait]
impl AnswerRepository for InMemoryRepository {
    async fn upsert_all(
        &self,
        response_id: ResponseId,
        answers: &AnswerMap,
        now: DateTime<Utc>,
    ) -> Result<u32, StorageError> {
        let mut state = self.lock()?;
        for (item_id, value) in answers {
            state
                .answers
                .entry((response_id, *item_id))
                .and_modify(|row| {
                    row.value = *value;
                    row.updated_at = now;
                })
                .or_insert_with(|| AnswerRow {
                    item_id: *item_id,
                    value: *value,
                    answered_at: now,
                    updated_at: now,
                });
        }
        Ok(answers.len() as u32)
    }

    async fn all_for(&self, response_id: ResponseId) -> Result<AnswerMap, StorageError> {
        let state = self.lock()?;
        Ok(state
            .answers
            .iter()
            .filter(|((rid, _), _)| *rid == response_id)
            .map(|((_, item_id), row)| (*item_id, row.value))
            .collect())
    }

    async fn rows_for(&self, response_id: ResponseId) -> Result<Vec<AnswerRow>, StorageError> {
        let state = self.lock()?;
        let mut rows: Vec<AnswerRow> = state
            .answers
            .iter()
            .filter(|((rid, _), _)| *rid == response_id)
            .map(|(_, row)| row.clone())
            .collect();
        rows.sort_by_key(|row| row.item_id);
        Ok(rows)
    }
}

#[async_trait]
impl ResultRepository for InMemoryRepository {
    async fn insert(&self, record: ResultRecord) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        if state.results.contains_key(&record.response_id) {
            return Err(StorageError::Conflict);
        }
        state.results.insert(record.response_id, record);
        Ok(())
    }

    async fn find_for_response(
        &self,
        response_id: ResponseId,
    ) -> Result<Option<ResultRecord>, StorageError> {
        let state = self.lock()?;
        Ok(state.results.get(&response_id).cloned())
    }

    async fn find_latest(
        &self,
        subject_id: SubjectId,
        instrument_id: InstrumentId,
    ) -> Result<Option<ResultRecord>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .results
            .values()
            .filter(|r| r.subject_id == subject_id && r.instrument_id == instrument_id)
            .max_by_key(|r| r.created_at)
            .cloned())
    }
}

#[async_trait]
impl RewardLedgerRepository for InMemoryRepository {
    async fn append(&self, entry: RewardEntry) -> Result<i64, StorageError> {
        let mut state = self.lock()?;
        state.ledger.push(entry);
        Ok(state.ledger.len() as i64)
    }

    async fn total_for(&self, subject_id: SubjectId) -> Result<i64, StorageError> {
        let state = self.lock()?;
        Ok(state
            .ledger
            .iter()
            .filter(|e| e.subject_id == subject_id)
            .map(|e| e.points)
            .sum())
    }

    async fn entries_for(&self, subject_id: SubjectId) -> Result<Vec<RewardEntry>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .ledger
            .iter()
            .filter(|e| e.subject_id == subject_id)
            .cloned()
            .collect())
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Aggregates the four repositories behind trait objects for easy backend
/// swapping.
#[derive(Clone)]
pub struct Storage {
    pub sessions: Arc<dyn SessionRepository>,
    pub answers: Arc<dyn AnswerRepository>,
    pub results: Arc<dyn ResultRepository>,
    pub rewards: Arc<dyn RewardLedgerRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            sessions: Arc::new(repo.clone()),
            answers: Arc::new(repo.clone()),
            results: Arc::new(repo.clone()),
            rewards: Arc::new(repo),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use assess_core::model::{
        CategoricalScore, CategoryScore, OptionId, ScoreBreakdown,
    };
    use assess_core::time::fixed_now;
    use chrono::Duration;

    fn breakdown() -> ScoreBreakdown {
        ScoreBreakdown::Categorical(CategoricalScore {
            categories: vec![CategoryScore {
                key: "visual".into(),
                label: "VISUAL".into(),
                count: 1,
                percentage: 100,
            }],
            predominant: "visual".into(),
            secondary: None,
            answered: 1,
        })
    }

    fn result_record(response_id: i64, created_at: DateTime<Utc>) -> ResultRecord {
        ResultRecord {
            response_id: ResponseId::new(response_id),
            assignment_id: AssignmentId::new(1),
            subject_id: SubjectId::new(10),
            instrument_id: InstrumentId::new(20),
            breakdown: breakdown(),
            strengths: String::new(),
            areas_for_improvement: String::new(),
            recommendations: String::new(),
            analyzed: false,
            mentor_feedback: None,
            created_at,
        }
    }

    #[tokio::test]
    async fn open_session_reuses_the_in_progress_assignment() {
        let repo = InMemoryRepository::new();
        let subject = SubjectId::new(10);
        let instrument = InstrumentId::new(20);

        let (a1, r1) = repo
            .open_session(subject, instrument, subject, fixed_now())
            .await
            .unwrap();
        let (a2, r2) = repo
            .open_session(subject, instrument, subject, fixed_now() + Duration::minutes(1))
            .await
            .unwrap();

        assert_eq!(a1.id, a2.id);
        assert_eq!(r1.id, r2.id);
        // The original start time survives the reuse.
        assert_eq!(r2.started_at, fixed_now());
    }

    #[tokio::test]
    async fn separate_instruments_get_separate_sessions() {
        let repo = InMemoryRepository::new();
        let subject = SubjectId::new(10);

        let (a1, _) = repo
            .open_session(subject, InstrumentId::new(1), subject, fixed_now())
            .await
            .unwrap();
        let (a2, _) = repo
            .open_session(subject, InstrumentId::new(2), subject, fixed_now())
            .await
            .unwrap();
        assert_ne!(a1.id, a2.id);
    }

    #[tokio::test]
    async fn upsert_is_idempotent_and_keeps_answered_at() {
        let repo = InMemoryRepository::new();
        let response = ResponseId::new(1);
        let mut answers = AnswerMap::new();
        answers.insert(ItemId::new(1), AnswerValue::Choice(OptionId::new(5)));
        answers.insert(ItemId::new(2), AnswerValue::Scale(3));

        let first = fixed_now();
        repo.upsert_all(response, &answers, first).await.unwrap();
        let later = first + Duration::seconds(30);
        answers.insert(ItemId::new(2), AnswerValue::Scale(5));
        repo.upsert_all(response, &answers, later).await.unwrap();

        let rows = repo.rows_for(response).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].answered_at, first);
        assert_eq!(rows[0].updated_at, later);
        assert_eq!(rows[1].value, AnswerValue::Scale(5));

        let map = repo.all_for(response).await.unwrap();
        assert_eq!(map, answers);
    }

    #[tokio::test]
    async fn all_for_returns_empty_map_for_unknown_response() {
        let repo = InMemoryRepository::new();
        let map = repo.all_for(ResponseId::new(99)).await.unwrap();
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn second_result_for_a_response_conflicts() {
        let repo = InMemoryRepository::new();
        repo.insert(result_record(1, fixed_now())).await.unwrap();
        let err = repo.insert(result_record(1, fixed_now())).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn find_latest_prefers_the_most_recent_result() {
        let repo = InMemoryRepository::new();
        repo.insert(result_record(1, fixed_now())).await.unwrap();
        repo.insert(result_record(2, fixed_now() + Duration::days(1)))
            .await
            .unwrap();

        let latest = repo
            .find_latest(SubjectId::new(10), InstrumentId::new(20))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.response_id, ResponseId::new(2));
    }

    #[tokio::test]
    async fn ledger_total_is_the_sum_of_entries() {
        let repo = InMemoryRepository::new();
        let subject = SubjectId::new(10);
        repo.append(RewardEntry::new(subject, 50, "a", fixed_now()))
            .await
            .unwrap();
        repo.append(RewardEntry::new(subject, 25, "b", fixed_now()))
            .await
            .unwrap();
        repo.append(RewardEntry::new(SubjectId::new(11), 99, "other", fixed_now()))
            .await
            .unwrap();

        assert_eq!(repo.total_for(subject).await.unwrap(), 75);
        assert_eq!(repo.entries_for(subject).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn mark_completed_is_one_way() {
        let repo = InMemoryRepository::new();
        let subject = SubjectId::new(10);
        let (assignment, response) = repo
            .open_session(subject, InstrumentId::new(1), subject, fixed_now())
            .await
            .unwrap();

        repo.mark_completed(assignment.id, response.id, fixed_now())
            .await
            .unwrap();
        let err = repo
            .mark_completed(assignment.id, response.id, fixed_now())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));

        // The completed session no longer shows up as in progress.
        let found = repo
            .find_in_progress(subject, InstrumentId::new(1))
            .await
            .unwrap();
        assert!(found.is_none());
    }
}
