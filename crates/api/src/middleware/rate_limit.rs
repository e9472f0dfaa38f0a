//! Rate limiting middleware.
//!
//! Limits are configured with strings like `"200 per minute"` or
//! `"10/second; 5000 per day"`. Every item gets its own keyed limiter; a
//! request is admitted only when all of them admit the client IP.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::{
    clock::{Clock, DefaultClock},
    state::keyed::DefaultKeyedStateStore,
    Quota, RateLimiter as GovRateLimiter,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;

use crate::app::AppState;
use crate::middleware::client_ip::ClientIp;

lazy_static! {
    static ref RATE_LIMIT_ITEM: Regex = Regex::new(
        r"(?i)^\s*(\d+)\s*(?:per|/)\s*(?:(\d+)\s*)?(second|minute|hour|day)s?\s*$"
    )
    .expect("rate limit pattern is valid");
}

type IpRateLimiter = GovRateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid rate limit '{item}': {reason}")]
pub struct RateLimitSpecError {
    pub item: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateUnit {
    Second,
    Minute,
    Hour,
    Day,
}

impl RateUnit {
    fn seconds(self) -> u64 {
        match self {
            RateUnit::Second => 1,
            RateUnit::Minute => 60,
            RateUnit::Hour => 3600,
            RateUnit::Day => 86400,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            RateUnit::Second => "second",
            RateUnit::Minute => "minute",
            RateUnit::Hour => "hour",
            RateUnit::Day => "day",
        }
    }
}

/// One `<amount> per <multiplier> <unit>` limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitItem {
    pub amount: NonZeroU32,
    pub multiplier: u32,
    pub unit: RateUnit,
}

impl RateLimitItem {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.unit.seconds() * u64::from(self.multiplier))
    }

    fn quota(&self) -> Option<Quota> {
        let per_cell = self.window() / self.amount.get();
        Quota::with_period(per_cell).map(|q| q.allow_burst(self.amount))
    }
}

impl fmt::Display for RateLimitItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.multiplier == 1 {
            write!(f, "{} per {}", self.amount, self.unit.as_str())
        } else {
            write!(
                f,
                "{} per {} {}s",
                self.amount,
                self.multiplier,
                self.unit.as_str()
            )
        }
    }
}

/// Parse a rate limit string. Empty or `"0"` means no limits.
pub fn parse_rate_limits(spec: &str) -> Result<Vec<RateLimitItem>, RateLimitSpecError> {
    let spec = spec.trim();
    if spec.is_empty() || spec == "0" {
        return Ok(Vec::new());
    }

    spec.split([';', ','])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(parse_item)
        .collect()
}

fn parse_item(item: &str) -> Result<RateLimitItem, RateLimitSpecError> {
    let err = |reason: &str| RateLimitSpecError {
        item: item.to_string(),
        reason: reason.to_string(),
    };

    let caps = RATE_LIMIT_ITEM
        .captures(item)
        .ok_or_else(|| err("expected '<n> per <second|minute|hour|day>'"))?;

    let amount = caps[1]
        .parse::<u32>()
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or_else(|| err("amount must be a positive integer"))?;

    let multiplier = match caps.get(2) {
        Some(m) => m
            .as_str()
            .parse::<u32>()
            .ok()
            .filter(|m| *m > 0)
            .ok_or_else(|| err("multiplier must be a positive integer"))?,
        None => 1,
    };

    let unit = match caps[3].to_ascii_lowercase().as_str() {
        "second" => RateUnit::Second,
        "minute" => RateUnit::Minute,
        "hour" => RateUnit::Hour,
        _ => RateUnit::Day,
    };

    Ok(RateLimitItem {
        amount,
        multiplier,
        unit,
    })
}

/// Per-IP limiter state shared across all requests.
pub struct RateLimiterState {
    limiters: Vec<(RateLimitItem, IpRateLimiter)>,
    clock: DefaultClock,
}

impl RateLimiterState {
    /// Build limiter state from parsed items. Returns `None` when there are no items.
    pub fn new(items: &[RateLimitItem]) -> Result<Option<Self>, RateLimitSpecError> {
        if items.is_empty() {
            return Ok(None);
        }

        let limiters = items
            .iter()
            .map(|item| {
                let quota = item.quota().ok_or_else(|| RateLimitSpecError {
                    item: item.to_string(),
                    reason: "window is too short for the amount".to_string(),
                })?;
                Ok((*item, GovRateLimiter::keyed(quota)))
            })
            .collect::<Result<Vec<_>, RateLimitSpecError>>()?;

        Ok(Some(Self {
            limiters,
            clock: DefaultClock::default(),
        }))
    }

    /// Parse and build in one step.
    pub fn from_spec(spec: &str) -> Result<Option<Self>, RateLimitSpecError> {
        Self::new(&parse_rate_limits(spec)?)
    }

    /// Check if a request from `ip` should be allowed.
    /// Returns the exceeded limit and retry-after seconds if rate limited.
    pub fn check(&self, ip: IpAddr) -> Result<(), (RateLimitItem, u64)> {
        for (item, limiter) in &self.limiters {
            if let Err(not_until) = limiter.check_key(&ip) {
                let wait_time = not_until.wait_time_from(self.clock.now());
                // Minimum 1 second
                return Err((*item, wait_time.as_secs().max(1)));
            }
        }
        Ok(())
    }

    /// Drop idle per-IP state.
    pub fn retain_recent(&self) {
        for (_, limiter) in &self.limiters {
            limiter.retain_recent();
            limiter.shrink_to_fit();
        }
    }
}

impl fmt::Debug for RateLimiterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiterState")
            .field(
                "limits",
                &self
                    .limiters
                    .iter()
                    .map(|(item, _)| item.to_string())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Middleware that applies rate limiting per client IP.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(rate_limiter) = state.rate_limiter.as_deref() else {
        return next.run(req).await;
    };

    // Clients without a known address share one bucket.
    let ip = ClientIp::from_request(&req, state.config.security.trust_proxy_headers)
        .ip()
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    if let Err((item, retry_after)) = rate_limiter.check(ip) {
        tracing::info!(client_ip = %ip, limit = %item, "Rate limit exceeded");
        metrics::counter!("rate_limited_requests_total").increment(1);
        return rate_limited_response(&item, retry_after);
    }

    next.run(req).await
}

/// Create a rate limited response with proper headers and body.
fn rate_limited_response(item: &RateLimitItem, retry_after: u64) -> Response {
    let body = json!({
        "error": "rate_limited",
        "message": format!("Rate limit of {} exceeded", item),
        "retryAfter": retry_after
    });

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    response
}
