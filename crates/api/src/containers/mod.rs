//! Optional container runtime integration.
//!
//! The runtime is probed once at startup. When it is unreachable the
//! container routes are not registered and everything else runs as usual.

pub mod docker;
pub mod models;

pub use docker::DockerClient;
pub use models::{ContainerDetails, ContainerSummary, LogLine, LogStream, RuntimeVersion};

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::ContainerConfig;

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("Invalid container host '{0}'")]
    InvalidHost(String),

    #[error("Invalid container id '{0}'")]
    InvalidId(String),

    #[error("Container {0} not found")]
    NotFound(String),

    #[error("Container runtime unreachable: {0}")]
    Connection(String),

    #[error("Container runtime did not respond within {0}s")]
    Timeout(u64),

    #[error("Container runtime returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected container runtime response: {0}")]
    Decode(String),
}

/// Operations the API exposes on the container runtime.
#[async_trait::async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn ping(&self) -> Result<(), ContainerError>;

    async fn version(&self) -> Result<RuntimeVersion, ContainerError>;

    async fn list(&self, all: bool) -> Result<Vec<ContainerSummary>, ContainerError>;

    async fn inspect(&self, id: &str) -> Result<ContainerDetails, ContainerError>;

    async fn start(&self, id: &str) -> Result<(), ContainerError>;

    async fn stop(&self, id: &str) -> Result<(), ContainerError>;

    async fn restart(&self, id: &str) -> Result<(), ContainerError>;

    /// The last `tail` log lines from stdout and stderr.
    async fn logs(&self, id: &str, tail: u32) -> Result<Vec<LogLine>, ContainerError>;
}

/// Probe the configured runtime. Returns a handle only if it answers a ping.
pub async fn detect(config: &ContainerConfig) -> Option<Arc<dyn ContainerRuntime>> {
    if !config.enabled {
        tracing::info!("Docker integration disabled by configuration");
        return None;
    }

    let host = resolve_host(&config.host);
    let client = match DockerClient::new(&host, Duration::from_secs(config.timeout_secs)) {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(error = %e, "Docker is not available. Skipping Docker integration.");
            return None;
        }
    };

    match client.ping().await {
        Ok(()) => {
            tracing::info!(host = %host, "Docker integration enabled");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(host = %host, error = %e, "Docker is not available. Skipping Docker integration.");
            None
        }
    }
}

/// An empty configured host falls back to `DOCKER_HOST`, then the default socket.
fn resolve_host(configured: &str) -> String {
    if !configured.trim().is_empty() {
        return configured.trim().to_string();
    }
    std::env::var("DOCKER_HOST")
        .ok()
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| "unix:///var/run/docker.sock".to_string())
}
