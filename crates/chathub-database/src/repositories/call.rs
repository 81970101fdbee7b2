//! Call session repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use chathub_core::error::{AppError, ErrorKind};
use chathub_core::result::AppResult;
use chathub_core::types::{CallId, UserId};
use chathub_entity::call::{CallSession, CallStatus, CallTransition};

use crate::store::CallStore;

/// Repository for call sessions.
#[derive(Debug, Clone)]
pub struct CallRepository {
    pool: PgPool,
}

impl CallRepository {
    /// Create a new call repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CallStore for CallRepository {
    async fn create_if_idle(&self, session: &CallSession) -> AppResult<CallSession> {
        let persistence =
            |e: sqlx::Error| AppError::with_source(ErrorKind::Persistence, "Failed to create call", e);

        let mut tx = self.pool.begin().await.map_err(persistence)?;

        // Serialize creations per participant. Locks are taken in id order
        // so two opposite calls cannot deadlock.
        let mut participants = [session.caller_id, session.recipient_id];
        participants.sort();
        for user_id in participants {
            sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::uuid::text, 0))")
                .bind(user_id)
                .execute(&mut *tx)
                .await
                .map_err(persistence)?;
        }

        let busy: Option<(bool,)> = sqlx::query_as(
            "SELECT caller_id = $1 OR recipient_id = $1 FROM call_sessions \
             WHERE (caller_id IN ($1, $2) OR recipient_id IN ($1, $2)) \
             AND status IN ('calling', 'connected') \
             ORDER BY 1 DESC LIMIT 1",
        )
        .bind(session.caller_id)
        .bind(session.recipient_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(persistence)?;
        match busy {
            Some((true,)) => return Err(AppError::conflict("Caller is already in a call")),
            Some((false,)) => return Err(AppError::conflict("Recipient is busy")),
            None => {}
        }

        let created = sqlx::query_as::<_, CallSession>(
            "INSERT INTO call_sessions (id, caller_id, recipient_id, status, created_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(session.id)
        .bind(session.caller_id)
        .bind(session.recipient_id)
        .bind(session.status)
        .bind(session.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_unique_violation() => {
                AppError::conflict("A participant is already in a call")
            }
            _ => persistence(e),
        })?;

        tx.commit().await.map_err(persistence)?;
        Ok(created)
    }

    async fn find_by_id(&self, id: CallId) -> AppResult<Option<CallSession>> {
        sqlx::query_as::<_, CallSession>("SELECT * FROM call_sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Persistence, "Failed to find call", e))
    }

    async fn find_active_for_user(&self, user_id: UserId) -> AppResult<Option<CallSession>> {
        sqlx::query_as::<_, CallSession>(
            "SELECT * FROM call_sessions \
             WHERE (caller_id = $1 OR recipient_id = $1) AND status IN ('calling', 'connected') \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Persistence, "Failed to find active call", e)
        })
    }

    async fn transition(
        &self,
        id: CallId,
        transition: &CallTransition,
    ) -> AppResult<Option<CallSession>> {
        // The WHERE clause on the current status makes this a compare-and-set:
        // of two racing transitions only one matches a row.
        sqlx::query_as::<_, CallSession>(
            "UPDATE call_sessions SET status = $3, \
             started_at = CASE WHEN $5 THEN $4 ELSE started_at END, \
             ended_at = CASE WHEN $6 THEN $4 ELSE ended_at END, \
             duration_seconds = CASE WHEN $6 AND started_at IS NOT NULL \
                 THEN GREATEST(0, FLOOR(EXTRACT(EPOCH FROM ($4 - started_at))))::BIGINT \
                 ELSE duration_seconds END, \
             end_reason = COALESCE($7, end_reason) \
             WHERE id = $1 AND status = $2 RETURNING *",
        )
        .bind(id)
        .bind(transition.from)
        .bind(transition.to)
        .bind(transition.at)
        .bind(transition.to == CallStatus::Connected)
        .bind(transition.to.is_terminal())
        .bind(transition.end_reason)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Persistence, "Failed to transition call", e))
    }

    async fn find_ringing_since(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<CallSession>> {
        sqlx::query_as::<_, CallSession>(
            "SELECT * FROM call_sessions WHERE status = 'calling' AND created_at < $1",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Persistence, "Failed to find ringing calls", e)
        })
    }

    async fn find_connected_since(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<CallSession>> {
        sqlx::query_as::<_, CallSession>(
            "SELECT * FROM call_sessions WHERE status = 'connected' AND started_at < $1",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Persistence, "Failed to find connected calls", e)
        })
    }
}
