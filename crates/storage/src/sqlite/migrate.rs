use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the full schema: assignments, responses, answers, results, the
/// reward ledger, and the indexes that enforce the session invariants.
/// Instruments are static configuration and are never persisted here.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS assignments (
                    id INTEGER PRIMARY KEY,
                    subject_id INTEGER NOT NULL,
                    instrument_id INTEGER NOT NULL,
                    assigned_by INTEGER NOT NULL,
                    status TEXT NOT NULL
                        CHECK (status IN ('assigned', 'in_progress', 'completed', 'expired')),
                    created_at TEXT NOT NULL,
                    completed_at TEXT
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        // At most one in-progress assignment per (subject, instrument).
        sqlx::query(
            r"
                CREATE UNIQUE INDEX IF NOT EXISTS idx_assignments_one_in_progress
                    ON assignments (subject_id, instrument_id)
                    WHERE status = 'in_progress';
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS responses (
                    id INTEGER PRIMARY KEY,
                    assignment_id INTEGER NOT NULL UNIQUE,
                    started_at TEXT NOT NULL,
                    submitted_at TEXT,
                    FOREIGN KEY (assignment_id) REFERENCES assignments(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS answers (
                    response_id INTEGER NOT NULL,
                    item_id INTEGER NOT NULL,
                    value TEXT NOT NULL,
                    answered_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    PRIMARY KEY (response_id, item_id),
                    FOREIGN KEY (response_id) REFERENCES responses(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        // One result per response; the primary key is the completion
        // critical section.
        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS results (
                    response_id INTEGER PRIMARY KEY,
                    assignment_id INTEGER NOT NULL,
                    subject_id INTEGER NOT NULL,
                    instrument_id INTEGER NOT NULL,
                    breakdown TEXT NOT NULL,
                    strengths TEXT NOT NULL,
                    areas_for_improvement TEXT NOT NULL,
                    recommendations TEXT NOT NULL,
                    analyzed INTEGER NOT NULL DEFAULT 0,
                    mentor_feedback TEXT,
                    created_at TEXT NOT NULL,
                    FOREIGN KEY (response_id) REFERENCES responses(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS reward_ledger (
                    id INTEGER PRIMARY KEY,
                    subject_id INTEGER NOT NULL,
                    points INTEGER NOT NULL,
                    reason TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_assignments_subject_instrument
                    ON assignments (subject_id, instrument_id, status);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_results_subject_instrument_created
                    ON results (subject_id, instrument_id, created_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_reward_ledger_subject
                    ON reward_ledger (subject_id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
