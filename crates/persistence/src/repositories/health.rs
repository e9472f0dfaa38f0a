//! Connectivity check for the database pool.

use domain::services::{StoreHealth, StoreResult};
use sqlx::PgPool;

use super::store_error;
use crate::metrics::{record_pool_stats, PoolStats};

#[derive(Clone)]
pub struct PoolHealth {
    pool: PgPool,
}

impl PoolHealth {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl StoreHealth for PoolHealth {
    async fn ping(&self) -> StoreResult<()> {
        record_pool_stats(PoolStats::sample(&self.pool));
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }
}
