use crate::domain::models::side_effect::{SideEffect, STATUS_COMPLETED, STATUS_FAILED, STATUS_PENDING, STATUS_SKIPPED_DUPLICATE};
use crate::domain::ports::SideEffectRepository;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

pub struct PostgresSideEffectRepo {
    pool: PgPool,
}

impl PostgresSideEffectRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SideEffectRepository for PostgresSideEffectRepo {
    async fn enqueue(&self, intent: &SideEffect) -> Result<SideEffect, AppError> {
        sqlx::query_as::<_, SideEffect>(
            "INSERT INTO side_effects (id, intent_type, booking_id, payload, dedup_hash, status, attempts, last_error, execute_at, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING *"
        )
            .bind(&intent.id).bind(&intent.intent_type).bind(&intent.booking_id).bind(&intent.payload)
            .bind(&intent.dedup_hash).bind(&intent.status).bind(intent.attempts).bind(&intent.last_error)
            .bind(intent.execute_at).bind(intent.created_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    // FOR UPDATE SKIP LOCKED keeps concurrent workers from claiming the same
    // intent twice.
    async fn claim_due(&self, limit: i64) -> Result<Vec<SideEffect>, AppError> {
        let now = Utc::now();
        sqlx::query_as::<_, SideEffect>(
            "UPDATE side_effects SET status = 'PROCESSING'
             WHERE id IN (
                 SELECT id FROM side_effects
                 WHERE status = 'PENDING' AND execute_at <= $1
                 ORDER BY execute_at ASC LIMIT $2
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING *"
        )
            .bind(now).bind(limit)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn mark_completed(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE side_effects SET status = $1, last_error = NULL WHERE id = $2")
            .bind(STATUS_COMPLETED).bind(id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn mark_skipped(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE side_effects SET status = $1 WHERE id = $2")
            .bind(STATUS_SKIPPED_DUPLICATE).bind(id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn mark_failed(&self, id: &str, error: &str, max_attempts: i64, retry_at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE side_effects
             SET attempts = attempts + 1,
                 last_error = $1,
                 status = CASE WHEN attempts + 1 >= $2 THEN $3 ELSE $4 END,
                 execute_at = $5
             WHERE id = $6"
        )
            .bind(error).bind(max_attempts).bind(STATUS_FAILED).bind(STATUS_PENDING)
            .bind(retry_at).bind(id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn has_completed_with_hash(&self, dedup_hash: &str) -> Result<bool, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM side_effects WHERE dedup_hash = $1 AND status = 'COMPLETED'"
        )
            .bind(dedup_hash)
            .fetch_one(&self.pool).await.map_err(AppError::Database)?;
        Ok(count > 0)
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<SideEffect>, AppError> {
        sqlx::query_as::<_, SideEffect>(
            "SELECT * FROM side_effects ORDER BY created_at DESC LIMIT $1"
        )
            .bind(limit)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_by_booking(&self, booking_id: &str) -> Result<Vec<SideEffect>, AppError> {
        sqlx::query_as::<_, SideEffect>(
            "SELECT * FROM side_effects WHERE booking_id = $1 ORDER BY created_at ASC"
        )
            .bind(booking_id)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }
}
