use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use domain::services::{SessionStore, SetupStore, StoreHealth, UserStore};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admission::{
    load_ip_lists, AdmissionPipeline, BlacklistGate, CsrfGate, ExemptPaths, LoginGate, SetupGate,
    WhitelistGate,
};
use crate::config::Config;
use crate::containers::ContainerRuntime;
use crate::error::StartupError;
use crate::middleware::{
    admission_middleware, metrics_handler, metrics_middleware, rate_limit_middleware,
    security_headers_middleware, trace_id, RateLimiterState, SecurityHeaders,
};
use crate::routes::{auth, backup, containers, csrf, health, pages, setup, system_info};
use crate::services::{AuthService, CookieHelper, CsrfTokens};

/// Storage backends behind the store traits.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub setup: Arc<dyn SetupStore>,
    pub health: Arc<dyn StoreHealth>,
}

impl Stores {
    /// Use one value for every store.
    pub fn from_single<S>(store: Arc<S>) -> Self
    where
        S: UserStore + SessionStore + SetupStore + StoreHealth + 'static,
    {
        Self {
            users: store.clone(),
            sessions: store.clone(),
            setup: store.clone(),
            health: store,
        }
    }
}

/// Application context shared by middleware and handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub stores: Stores,
    pub auth: AuthService,
    pub csrf: CsrfTokens,
    pub cookies: CookieHelper,
    pub admission: Arc<AdmissionPipeline>,
    pub rate_limiter: Option<Arc<RateLimiterState>>,
    pub security_headers: Arc<SecurityHeaders>,
    pub cors: CorsLayer,
    pub containers: Option<Arc<dyn ContainerRuntime>>,
    pub started_at: Instant,
}

impl AppState {
    /// Assemble the context once at startup.
    ///
    /// Fails on malformed IP patterns, rate limits, CORS origins or frame options.
    pub fn build(
        config: Config,
        stores: Stores,
        containers: Option<Arc<dyn ContainerRuntime>>,
    ) -> Result<Self, StartupError> {
        let security = &config.security;
        let static_prefix = config.server.static_prefix.as_str();

        let auth = AuthService::new(
            stores.users.clone(),
            stores.sessions.clone(),
            security.session_ttl_secs,
        );
        let csrf = CsrfTokens::new(&security.secret_key, security.csrf_time_limit_secs);

        let (blacklist, whitelist) = load_ip_lists(&config.ip_filter)?;

        let mut setup_exempt = ExemptPaths::new(&security.setup_exempt_paths);
        setup_exempt.push(static_prefix);
        let mut login_exempt = ExemptPaths::new(&security.login_exempt_paths);
        login_exempt.push(static_prefix);

        let mut pipeline = AdmissionPipeline::new()
            .with_gate(BlacklistGate::new(blacklist))
            .with_gate(WhitelistGate::new(whitelist))
            .with_gate(SetupGate::new(stores.setup.clone(), setup_exempt))
            .with_gate(LoginGate::new(auth.clone(), login_exempt));
        if security.csrf_enabled {
            pipeline = pipeline.with_gate(CsrfGate::new(
                csrf.clone(),
                ExemptPaths::new(&security.csrf_exempt_paths),
            ));
        } else {
            tracing::warn!("CSRF protection is disabled");
        }
        tracing::info!(gates = ?pipeline.gate_names(), "Admission pipeline assembled");

        let rate_limiter = RateLimiterState::from_spec(&security.rate_limit)?.map(Arc::new);
        let security_headers = Arc::new(SecurityHeaders::from_config(&config)?);
        let cors = build_cors(&security.allowed_origins)?;
        let cookies = CookieHelper::from_config(security);

        Ok(Self {
            config: Arc::new(config),
            stores,
            auth,
            csrf,
            cookies,
            admission: Arc::new(pipeline),
            rate_limiter,
            security_headers,
            cors,
            containers,
            started_at: Instant::now(),
        })
    }
}

/// `*` allows any origin; anything else is a comma-separated origin list.
fn build_cors(allowed_origins: &str) -> Result<CorsLayer, StartupError> {
    let allowed_origins = allowed_origins.trim();
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if allowed_origins == "*" {
        return Ok(layer.allow_origin(Any));
    }

    let origins = allowed_origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(|origin| {
            if !(origin.starts_with("http://") || origin.starts_with("https://")) {
                return Err(StartupError::CorsOrigin(origin.to_string()));
            }
            HeaderValue::from_str(origin.trim_end_matches('/'))
                .map_err(|_| StartupError::CorsOrigin(origin.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(layer.allow_origin(AllowOrigin::list(origins)))
}

pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    let auth_routes = Router::new()
        .route("/auth/login", get(auth::login_page).post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me));

    let setup_routes = Router::new()
        .route("/setup", get(setup::setup_root))
        .route("/setup/start", get(setup::setup_start))
        .route("/setup/status", get(setup::setup_status))
        .route("/setup/admin", post(setup::create_admin))
        .route("/setup/restore", post(setup::restore_from_backup));

    let api_routes = Router::new()
        .route("/api/csrf-token", get(csrf::csrf_token))
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/api/system_info", get(system_info::system_info))
        .route("/api/backup", get(backup::download_backup))
        .route("/api/backup/restore", post(backup::restore_backup));

    let mut app = Router::new()
        .route("/", get(pages::index))
        .route("/metrics", get(metrics_handler))
        .merge(auth_routes)
        .merge(setup_routes)
        .merge(api_routes)
        .nest_service(
            &config.server.static_prefix,
            ServeDir::new(&config.server.static_dir),
        );

    if state.containers.is_some() {
        app = app.merge(containers::router());
    }

    // The last layer added runs first: security headers wrap everything, then
    // the request id span, metrics, rate limiting and admission. CORS sits
    // inside admission so preflights still pass the IP gates.
    app.fallback(pages::not_found)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(state.cors.clone())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admission_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(middleware::from_fn_with_state(
            state.security_headers.clone(),
            security_headers_middleware,
        ))
        .with_state(state)
}
