use assess_core::model::{InstrumentId, ResponseId, SubjectId};

use super::{
    SqliteRepository,
    mapping::{breakdown_to_json, id_to_i64, map_result_row},
};
use crate::repository::{ResultRecord, ResultRepository, StorageError};

#[async_trait::async_trait]
impl ResultRepository for SqliteRepository {
    async fn insert(&self, record: ResultRecord) -> Result<(), StorageError> {
        // `DO NOTHING` plus the rows_affected check makes the uniqueness of
        // (response -> result) the atomic critical section for completion.
        let res = sqlx::query(
            r"
            INSERT INTO results (
                response_id, assignment_id, subject_id, instrument_id, breakdown,
                strengths, areas_for_improvement, recommendations,
                analyzed, mentor_feedback, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(response_id) DO NOTHING
            ",
        )
        .bind(record.response_id.value())
        .bind(record.assignment_id.value())
        .bind(id_to_i64("subject_id", record.subject_id.value())?)
        .bind(id_to_i64("instrument_id", record.instrument_id.value())?)
        .bind(breakdown_to_json(&record.breakdown)?)
        .bind(&record.strengths)
        .bind(&record.areas_for_improvement)
        .bind(&record.recommendations)
        .bind(record.analyzed)
        .bind(&record.mentor_feedback)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }
        Ok(())
    }

    async fn find_for_response(
        &self,
        response_id: ResponseId,
    ) -> Result<Option<ResultRecord>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                response_id, assignment_id, subject_id, instrument_id, breakdown,
                strengths, areas_for_improvement, recommendations,
                analyzed, mentor_feedback, created_at
            FROM results
            WHERE response_id = ?1
            ",
        )
        .bind(response_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_result_row).transpose()
    }

    async fn find_latest(
        &self,
        subject_id: SubjectId,
        instrument_id: InstrumentId,
    ) -> Result<Option<ResultRecord>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                response_id, assignment_id, subject_id, instrument_id, breakdown,
                strengths, areas_for_improvement, recommendations,
                analyzed, mentor_feedback, created_at
            FROM results
            WHERE subject_id = ?1 AND instrument_id = ?2
            ORDER BY created_at DESC, response_id DESC
            LIMIT 1
            ",
        )
        .bind(id_to_i64("subject_id", subject_id.value())?)
        .bind(id_to_i64("instrument_id", instrument_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_result_row).transpose()
    }
}
