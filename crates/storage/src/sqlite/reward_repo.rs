use assess_core::model::{RewardEntry, SubjectId};
use sqlx::Row;

use super::{
    SqliteRepository,
    mapping::{id_to_i64, map_reward_row},
};
use crate::repository::{RewardLedgerRepository, StorageError};

#[async_trait::async_trait]
impl RewardLedgerRepository for SqliteRepository {
    async fn append(&self, entry: RewardEntry) -> Result<i64, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO reward_ledger (subject_id, points, reason, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(id_to_i64("subject_id", entry.subject_id.value())?)
        .bind(entry.points)
        .bind(&entry.reason)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.last_insert_rowid())
    }

    async fn total_for(&self, subject_id: SubjectId) -> Result<i64, StorageError> {
        let row = sqlx::query(
            r"
            SELECT COALESCE(SUM(points), 0) AS total
            FROM reward_ledger
            WHERE subject_id = ?1
            ",
        )
        .bind(id_to_i64("subject_id", subject_id.value())?)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.try_get("total")
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn entries_for(&self, subject_id: SubjectId) -> Result<Vec<RewardEntry>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT subject_id, points, reason, created_at
            FROM reward_ledger
            WHERE subject_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_to_i64("subject_id", subject_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_reward_row(&row)?);
        }
        Ok(out)
    }
}
