use domain::services::SetupStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{found, AdmissionContext, ExemptPaths, Gate, GateOutcome};
use crate::error::ApiError;

/// Redirects every non-exempt request to `/setup` until an admin exists.
///
/// Completion is read from the store on each request until it is first
/// observed, then cached for the life of the process.
pub struct SetupGate {
    store: Arc<dyn SetupStore>,
    exempt: ExemptPaths,
    completed: AtomicBool,
}

impl SetupGate {
    pub fn new(store: Arc<dyn SetupStore>, exempt: ExemptPaths) -> Self {
        Self {
            store,
            exempt,
            completed: AtomicBool::new(false),
        }
    }
}

#[async_trait::async_trait]
impl Gate for SetupGate {
    fn name(&self) -> &'static str {
        "setup_required"
    }

    async fn evaluate(&self, ctx: &mut AdmissionContext<'_>) -> Result<GateOutcome, ApiError> {
        if self.completed.load(Ordering::Acquire)
            || ctx.is_preflight()
            || self.exempt.matches(ctx.path)
        {
            return Ok(GateOutcome::Continue);
        }

        if self.store.state().await?.completed {
            self.completed.store(true, Ordering::Release);
            tracing::info!("Setup complete; setup gate disengaged");
            return Ok(GateOutcome::Continue);
        }

        Ok(GateOutcome::Terminate(found("/setup")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderMap, Method, StatusCode};
    use domain::models::NewUser;
    use domain::services::InMemoryStore;

    fn gate(store: Arc<InMemoryStore>) -> SetupGate {
        SetupGate::new(store, ExemptPaths::new(["/setup", "/static", "/api/health"]))
    }

    async fn run(gate: &SetupGate, method: &Method, path: &str) -> GateOutcome {
        let headers = HeaderMap::new();
        let mut ctx = AdmissionContext::new(method, path, &headers, None);
        gate.evaluate(&mut ctx).await.unwrap()
    }

    #[tokio::test]
    async fn test_redirects_before_setup() {
        let gate = gate(Arc::new(InMemoryStore::new()));
        match run(&gate, &Method::GET, "/").await {
            GateOutcome::Terminate(response) => {
                assert_eq!(response.status(), StatusCode::FOUND);
                assert_eq!(response.headers()[header::LOCATION], "/setup");
            }
            GateOutcome::Continue => panic!("expected redirect"),
        }
    }

    #[tokio::test]
    async fn test_exempt_paths_pass_before_setup() {
        let store = Arc::new(InMemoryStore::new());
        let gate = gate(store.clone());
        for path in ["/setup", "/setup/start", "/static/app.js", "/api/health"] {
            assert!(matches!(
                run(&gate, &Method::GET, path).await,
                GateOutcome::Continue
            ));
        }
        assert_eq!(store.setup_reads(), 0);
    }

    #[tokio::test]
    async fn test_preflight_passes() {
        let gate = gate(Arc::new(InMemoryStore::new()));
        assert!(matches!(
            run(&gate, &Method::OPTIONS, "/api/system_info").await,
            GateOutcome::Continue
        ));
    }

    #[tokio::test]
    async fn test_caches_completion() {
        let store = Arc::new(InMemoryStore::new());
        let gate = gate(store.clone());

        assert!(matches!(
            run(&gate, &Method::GET, "/").await,
            GateOutcome::Terminate(_)
        ));
        store
            .complete_with_admin(NewUser::admin("admin", "hash"))
            .await
            .unwrap();

        for _ in 0..3 {
            assert!(matches!(
                run(&gate, &Method::GET, "/").await,
                GateOutcome::Continue
            ));
        }
        // One read while incomplete, one that observed completion.
        assert_eq!(store.setup_reads(), 2);
    }

    #[tokio::test]
    async fn test_store_failure_is_error() {
        let store = Arc::new(InMemoryStore::new());
        store.set_simulate_failure(true);
        let gate = gate(store);

        let headers = HeaderMap::new();
        let mut ctx = AdmissionContext::new(&Method::GET, "/", &headers, None);
        assert!(gate.evaluate(&mut ctx).await.is_err());
    }
}
