//! Database metrics: per-query latency and pool occupancy.

use metrics::{counter, gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

/// Point-in-time view of the connection pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub open: u32,
    pub idle: u32,
    pub max: u32,
}

impl PoolStats {
    pub fn sample(pool: &PgPool) -> Self {
        Self {
            open: pool.size(),
            idle: u32::try_from(pool.num_idle()).unwrap_or(u32::MAX),
            max: pool.options().get_max_connections(),
        }
    }

    pub fn in_use(&self) -> u32 {
        self.open.saturating_sub(self.idle)
    }

    /// Every permitted connection is checked out; new queries will wait.
    pub fn exhausted(&self) -> bool {
        self.max > 0 && self.in_use() >= self.max
    }
}

/// Publish pool gauges.
pub fn record_pool_stats(stats: PoolStats) {
    gauge!("coconut_db_pool_connections", "state" => "in_use").set(f64::from(stats.in_use()));
    gauge!("coconut_db_pool_connections", "state" => "idle").set(f64::from(stats.idle));
    gauge!("coconut_db_pool_max_connections").set(f64::from(stats.max));
}

/// Times one repository call.
///
/// ```ignore
/// let timer = QueryTimer::start("find_user_by_username");
/// let result = sqlx::query_as::<_, UserEntity>(...).fetch_optional(&pool).await;
/// timer.finish(&result);
/// ```
pub struct QueryTimer {
    query: &'static str,
    started: Instant,
}

impl QueryTimer {
    pub fn start(query: &'static str) -> Self {
        Self {
            query,
            started: Instant::now(),
        }
    }

    /// Record the latency, and count the call as failed when `result` is an error.
    pub fn finish<T, E: std::fmt::Display>(self, result: &Result<T, E>) {
        histogram!("coconut_db_query_duration_seconds", "query" => self.query)
            .record(self.started.elapsed().as_secs_f64());

        if let Err(e) = result {
            counter!("coconut_db_query_errors_total", "query" => self.query).increment(1);
            tracing::debug!(query = self.query, error = %e, "Database query failed");
        }
    }
}
