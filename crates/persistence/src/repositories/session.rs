//! Session repository for database operations.

use domain::models::{NewSession, Session};
use domain::services::{SessionStore, StoreResult};
use sqlx::PgPool;

use super::store_error;
use crate::entities::SessionEntity;
use crate::metrics::QueryTimer;

/// Repository for login sessions.
#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SessionStore for SessionRepository {
    async fn create(&self, session: NewSession) -> StoreResult<Session> {
        let timer = QueryTimer::start("create_session");
        let result = sqlx::query_as::<_, SessionEntity>(
            r#"
            INSERT INTO sessions (token_hash, user_id, expires_at, ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING token_hash, user_id, logged_in, created_at, expires_at, ip_address, user_agent
            "#,
        )
        .bind(&session.token_hash)
        .bind(session.user_id)
        .bind(session.expires_at)
        .bind(&session.ip_address)
        .bind(&session.user_agent)
        .fetch_one(&self.pool)
        .await;
        timer.finish(&result);
        Ok(result.map_err(store_error)?.into())
    }

    async fn find_active(&self, token_hash: &str) -> StoreResult<Option<Session>> {
        let timer = QueryTimer::start("find_active_session");
        let result = sqlx::query_as::<_, SessionEntity>(
            r#"
            SELECT token_hash, user_id, logged_in, created_at, expires_at, ip_address, user_agent
            FROM sessions
            WHERE token_hash = $1 AND logged_in = TRUE AND expires_at > NOW()
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&result);
        Ok(result.map_err(store_error)?.map(Into::into))
    }

    async fn delete(&self, token_hash: &str) -> StoreResult<()> {
        let timer = QueryTimer::start("delete_session");
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await;
        timer.finish(&result);
        result.map_err(store_error)?;
        Ok(())
    }

    async fn purge_expired(&self) -> StoreResult<u64> {
        let timer = QueryTimer::start("purge_expired_sessions");
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await;
        timer.finish(&result);
        Ok(result.map_err(store_error)?.rows_affected())
    }
}
