//! Samples the database pool for the metrics endpoint.

use persistence::metrics::{record_pool_stats, PoolStats};
use sqlx::PgPool;
use std::sync::atomic::{AtomicBool, Ordering};

use super::scheduler::{Job, JobFrequency};

pub struct PoolMetricsJob {
    pool: PgPool,
    exhausted: AtomicBool,
}

impl PoolMetricsJob {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            exhausted: AtomicBool::new(false),
        }
    }
}

#[async_trait::async_trait]
impl Job for PoolMetricsJob {
    fn name(&self) -> &'static str {
        "pool_metrics"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(10)
    }

    async fn execute(&self) -> Result<(), String> {
        let stats = PoolStats::sample(&self.pool);
        record_pool_stats(stats);

        // Warn once per episode rather than on every sample.
        let exhausted = stats.exhausted();
        if exhausted && !self.exhausted.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                in_use = stats.in_use(),
                max = stats.max,
                "Database pool exhausted; requests are waiting for connections"
            );
        } else if !exhausted && self.exhausted.swap(false, Ordering::Relaxed) {
            tracing::info!(in_use = stats.in_use(), "Database pool recovered");
        }
        Ok(())
    }
}
