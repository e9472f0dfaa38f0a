//! Setup state repository.

use domain::models::{NewUser, SetupState, User};
use domain::services::{SetupStore, StoreError, StoreResult};
use sqlx::PgPool;

use super::store_error;
use crate::entities::{SetupStateEntity, UserEntity};
use crate::metrics::QueryTimer;

/// Repository for the single-row setup flag.
#[derive(Clone)]
pub struct SetupRepository {
    pool: PgPool,
}

impl SetupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SetupStore for SetupRepository {
    async fn state(&self) -> StoreResult<SetupState> {
        let timer = QueryTimer::start("get_setup_state");
        let result = sqlx::query_as::<_, SetupStateEntity>(
            "SELECT completed, completed_at FROM setup_state WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&result);
        // A missing row means the seed migration has not run; treat as not set up.
        Ok(result
            .map_err(store_error)?
            .map(Into::into)
            .unwrap_or_default())
    }

    async fn complete_with_admin(&self, admin: NewUser) -> StoreResult<User> {
        let timer = QueryTimer::start("complete_setup_with_admin");

        // User insert and flag update commit together; the row lock serializes
        // concurrent setup attempts.
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        let completed: Option<bool> = sqlx::query_scalar(
            "SELECT completed FROM setup_state WHERE id = 1 FOR UPDATE",
        )
        .fetch_optional(&mut *tx)
        .await
        .map_err(store_error)?;

        if completed.unwrap_or(false) {
            return Err(StoreError::Conflict("Setup already completed".to_string()));
        }

        let user = sqlx::query_as::<_, UserEntity>(
            r#"
            INSERT INTO users (username, password_hash, is_admin)
            VALUES ($1, $2, $3)
            RETURNING id, username, password_hash, is_admin, created_at, last_login_at
            "#,
        )
        .bind(&admin.username)
        .bind(&admin.password_hash)
        .bind(admin.is_admin)
        .fetch_one(&mut *tx)
        .await
        .map_err(store_error)?;

        sqlx::query(
            r#"
            INSERT INTO setup_state (id, completed, completed_at)
            VALUES (1, TRUE, NOW())
            ON CONFLICT (id) DO UPDATE SET completed = TRUE, completed_at = NOW()
            "#,
        )
        .execute(&mut *tx)
        .await
        .map_err(store_error)?;

        let committed = tx.commit().await;
        timer.finish(&committed);
        committed.map_err(store_error)?;

        Ok(user.into())
    }

    async fn mark_complete(&self) -> StoreResult<SetupState> {
        let timer = QueryTimer::start("mark_setup_complete");
        let result = sqlx::query_as::<_, SetupStateEntity>(
            r#"
            INSERT INTO setup_state (id, completed, completed_at)
            VALUES (1, TRUE, NOW())
            ON CONFLICT (id) DO UPDATE
                SET completed = TRUE,
                    completed_at = COALESCE(setup_state.completed_at, NOW())
            RETURNING completed, completed_at
            "#,
        )
        .fetch_one(&self.pool)
        .await;
        timer.finish(&result);
        Ok(result.map_err(store_error)?.into())
    }
}
