use chrono::{DateTime, Utc};

use assess_core::model::{AnswerMap, ResponseId};

use super::{
    SqliteRepository,
    mapping::{answer_value_to_json, id_to_i64, map_answer_row},
};
use crate::repository::{AnswerRepository, AnswerRow, StorageError};

#[async_trait::async_trait]
impl AnswerRepository for SqliteRepository {
    async fn upsert_all(
        &self,
        response_id: ResponseId,
        answers: &AnswerMap,
        now: DateTime<Utc>,
    ) -> Result<u32, StorageError> {
        if answers.is_empty() {
            return Ok(0);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        for (item_id, value) in answers {
            sqlx::query(
                r"
                INSERT INTO answers (response_id, item_id, value, answered_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(response_id, item_id) DO UPDATE SET
                    -- keep answered_at from the original insert
                    value = excluded.value,
                    updated_at = excluded.updated_at
                ",
            )
            .bind(response_id.value())
            .bind(id_to_i64("item_id", item_id.value())?)
            .bind(answer_value_to_json(value)?)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(answers.len() as u32)
    }

    async fn all_for(&self, response_id: ResponseId) -> Result<AnswerMap, StorageError> {
        let rows = self.rows_for(response_id).await?;
        Ok(rows.into_iter().map(|row| (row.item_id, row.value)).collect())
    }

    async fn rows_for(&self, response_id: ResponseId) -> Result<Vec<AnswerRow>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT item_id, value, answered_at, updated_at
            FROM answers
            WHERE response_id = ?1
            ORDER BY item_id ASC
            ",
        )
        .bind(response_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_answer_row(&row)?);
        }
        Ok(out)
    }
}
