use crate::domain::models::side_effect::{SideEffect, STATUS_COMPLETED, STATUS_FAILED, STATUS_PENDING, STATUS_SKIPPED_DUPLICATE};
use crate::domain::ports::SideEffectRepository;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

pub struct SqliteSideEffectRepo {
    pool: SqlitePool,
}

impl SqliteSideEffectRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SideEffectRepository for SqliteSideEffectRepo {
    async fn enqueue(&self, intent: &SideEffect) -> Result<SideEffect, AppError> {
        sqlx::query_as::<_, SideEffect>(
            "INSERT INTO side_effects (id, intent_type, booking_id, payload, dedup_hash, status, attempts, last_error, execute_at, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING *"
        )
            .bind(&intent.id).bind(&intent.intent_type).bind(&intent.booking_id).bind(&intent.payload)
            .bind(&intent.dedup_hash).bind(&intent.status).bind(intent.attempts).bind(&intent.last_error)
            .bind(intent.execute_at).bind(intent.created_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn claim_due(&self, limit: i64) -> Result<Vec<SideEffect>, AppError> {
        let now = Utc::now();
        sqlx::query_as::<_, SideEffect>(
            "UPDATE side_effects SET status = 'PROCESSING'
             WHERE id IN (
                 SELECT id FROM side_effects
                 WHERE status = 'PENDING' AND execute_at <= ?
                 ORDER BY execute_at ASC LIMIT ?
             )
             RETURNING *"
        )
            .bind(now).bind(limit)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn mark_completed(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE side_effects SET status = ?, last_error = NULL WHERE id = ?")
            .bind(STATUS_COMPLETED).bind(id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn mark_skipped(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE side_effects SET status = ? WHERE id = ?")
            .bind(STATUS_SKIPPED_DUPLICATE).bind(id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn mark_failed(&self, id: &str, error: &str, max_attempts: i64, retry_at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE side_effects
             SET attempts = attempts + 1,
                 last_error = ?,
                 status = CASE WHEN attempts + 1 >= ? THEN ? ELSE ? END,
                 execute_at = ?
             WHERE id = ?"
        )
            .bind(error).bind(max_attempts).bind(STATUS_FAILED).bind(STATUS_PENDING)
            .bind(retry_at).bind(id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn has_completed_with_hash(&self, dedup_hash: &str) -> Result<bool, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM side_effects WHERE dedup_hash = ? AND status = 'COMPLETED'"
        )
            .bind(dedup_hash)
            .fetch_one(&self.pool).await.map_err(AppError::Database)?;
        Ok(count > 0)
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<SideEffect>, AppError> {
        sqlx::query_as::<_, SideEffect>(
            "SELECT * FROM side_effects ORDER BY created_at DESC LIMIT ?"
        )
            .bind(limit)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_by_booking(&self, booking_id: &str) -> Result<Vec<SideEffect>, AppError> {
        sqlx::query_as::<_, SideEffect>(
            "SELECT * FROM side_effects WHERE booking_id = ? ORDER BY created_at ASC"
        )
            .bind(booking_id)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }
}
