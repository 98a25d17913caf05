use chrono::{DateTime, Utc};

use assess_core::model::{AssignmentId, InstrumentId, ResponseId, SubjectId};

use super::{
    SqliteRepository,
    mapping::{id_to_i64, map_assignment_row},
};
use crate::repository::{AssignmentRecord, ResponseRecord, SessionRepository, StorageError};

const FIND_IN_PROGRESS: &str = r"
    SELECT
        a.id, a.subject_id, a.instrument_id, a.assigned_by, a.status,
        a.created_at, a.completed_at,
        r.id AS response_id, r.assignment_id, r.started_at, r.submitted_at
    FROM assignments a
    JOIN responses r ON r.assignment_id = a.id
    WHERE a.subject_id = ?1
      AND a.instrument_id = ?2
      AND a.status = 'in_progress'
";

fn split_session_row(row: &sqlx::sqlite::SqliteRow) -> Result<(AssignmentRecord, ResponseRecord), StorageError> {
    use sqlx::Row;

    let assignment = map_assignment_row(row)?;
    let response = ResponseRecord {
        id: ResponseId::new(
            row.try_get("response_id")
                .map_err(|e| StorageError::Serialization(e.to_string()))?,
        ),
        assignment_id: assignment.id,
        started_at: row
            .try_get("started_at")
            .map_err(|e| StorageError::Serialization(e.to_string()))?,
        submitted_at: row
            .try_get("submitted_at")
            .map_err(|e| StorageError::Serialization(e.to_string()))?,
    };
    Ok((assignment, response))
}

#[async_trait::async_trait]
impl SessionRepository for SqliteRepository {
    async fn find_in_progress(
        &self,
        subject_id: SubjectId,
        instrument_id: InstrumentId,
    ) -> Result<Option<(AssignmentRecord, ResponseRecord)>, StorageError> {
        let row = sqlx::query(FIND_IN_PROGRESS)
            .bind(id_to_i64("subject_id", subject_id.value())?)
            .bind(id_to_i64("instrument_id", instrument_id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(split_session_row).transpose()
    }

    async fn open_session(
        &self,
        subject_id: SubjectId,
        instrument_id: InstrumentId,
        assigned_by: SubjectId,
        started_at: DateTime<Utc>,
    ) -> Result<(AssignmentRecord, ResponseRecord), StorageError> {
        let subject = id_to_i64("subject_id", subject_id.value())?;
        let instrument = id_to_i64("instrument_id", instrument_id.value())?;
        let by = id_to_i64("assigned_by", assigned_by.value())?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        // The partial unique index makes the insert a no-op when another
        // writer got there first; either way exactly one in-progress
        // session exists afterwards.
        let inserted = sqlx::query(
            r"
            INSERT INTO assignments (subject_id, instrument_id, assigned_by, status, created_at)
            VALUES (?1, ?2, ?3, 'in_progress', ?4)
            ON CONFLICT (subject_id, instrument_id) WHERE status = 'in_progress'
                DO NOTHING
            ",
        )
        .bind(subject)
        .bind(instrument)
        .bind(by)
        .bind(started_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if inserted.rows_affected() == 1 {
            let assignment_id = inserted.last_insert_rowid();
            sqlx::query(
                r"
                INSERT INTO responses (assignment_id, started_at)
                VALUES (?1, ?2)
                ",
            )
            .bind(assignment_id)
            .bind(started_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        let row = sqlx::query(FIND_IN_PROGRESS)
            .bind(subject)
            .bind(instrument)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => split_session_row(&row),
            None => Err(StorageError::Conflict),
        }
    }

    async fn mark_completed(
        &self,
        assignment_id: AssignmentId,
        response_id: ResponseId,
        submitted_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let updated = sqlx::query(
            r"
            UPDATE assignments
            SET status = 'completed', completed_at = ?2
            WHERE id = ?1 AND status IN ('assigned', 'in_progress')
            ",
        )
        .bind(assignment_id.value())
        .bind(submitted_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if updated.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM assignments WHERE id = ?1")
                .bind(assignment_id.value())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            return Err(if exists.is_some() {
                StorageError::Conflict
            } else {
                StorageError::NotFound
            });
        }

        sqlx::query(
            r"
            UPDATE responses
            SET submitted_at = ?2
            WHERE id = ?1 AND submitted_at IS NULL
            ",
        )
        .bind(response_id.value())
        .bind(submitted_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    async fn mark_expired(&self, assignment_id: AssignmentId) -> Result<(), StorageError> {
        let updated = sqlx::query(
            r"
            UPDATE assignments
            SET status = 'expired'
            WHERE id = ?1 AND status IN ('assigned', 'in_progress')
            ",
        )
        .bind(assignment_id.value())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if updated.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM assignments WHERE id = ?1")
                .bind(assignment_id.value())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            return Err(if exists.is_some() {
                StorageError::Conflict
            } else {
                StorageError::NotFound
            });
        }
        Ok(())
    }
}
