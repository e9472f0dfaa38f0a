//! Host and process information.

use axum::{extract::State, Json};
use serde::Serialize;
use sysinfo::{Disks, System, MINIMUM_CPU_UPDATE_INTERVAL};

use crate::app::AppState;
use crate::containers::RuntimeVersion;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct SystemInfoResponse {
    pub hostname: Option<String>,
    pub os: OsInfo,
    pub uptime_secs: u64,
    pub cpu: CpuInfo,
    pub memory: MemoryInfo,
    pub disk: DiskInfo,
    pub app: AppInfo,
    pub containers: ContainersInfo,
}

#[derive(Debug, Serialize)]
pub struct OsInfo {
    pub name: Option<String>,
    pub version: Option<String>,
    pub kernel: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CpuInfo {
    pub count: usize,
    pub usage_percent: f32,
}

/// Sizes in bytes.
#[derive(Debug, Serialize)]
pub struct MemoryInfo {
    pub total: u64,
    pub used: u64,
    pub available: u64,
}

/// Sizes in bytes, summed over all mounted disks.
#[derive(Debug, Serialize)]
pub struct DiskInfo {
    pub total: u64,
    pub available: u64,
}

#[derive(Debug, Serialize)]
pub struct AppInfo {
    pub version: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct ContainersInfo {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<RuntimeVersion>,
}

struct HostSnapshot {
    cpu: CpuInfo,
    memory: MemoryInfo,
    disk: DiskInfo,
}

/// CPU usage needs two samples; the sleep keeps this off the async workers.
fn sample_host() -> HostSnapshot {
    let mut sys = System::new();
    sys.refresh_cpu();
    std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
    sys.refresh_cpu();
    sys.refresh_memory();

    let disks = Disks::new_with_refreshed_list();
    let (total, available) = disks.iter().fold((0u64, 0u64), |(t, a), disk| {
        (t + disk.total_space(), a + disk.available_space())
    });

    HostSnapshot {
        cpu: CpuInfo {
            count: sys.cpus().len(),
            usage_percent: sys.global_cpu_info().cpu_usage(),
        },
        memory: MemoryInfo {
            total: sys.total_memory(),
            used: sys.used_memory(),
            available: sys.available_memory(),
        },
        disk: DiskInfo { total, available },
    }
}

/// GET /api/system_info
pub async fn system_info(
    State(state): State<AppState>,
) -> Result<Json<SystemInfoResponse>, ApiError> {
    let host = tokio::task::spawn_blocking(sample_host)
        .await
        .map_err(|e| ApiError::Internal(format!("System sampling failed: {}", e)))?;

    let runtime = match &state.containers {
        Some(runtime) => match runtime.version().await {
            Ok(version) => Some(version),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to query container runtime version");
                None
            }
        },
        None => None,
    };

    Ok(Json(SystemInfoResponse {
        hostname: System::host_name(),
        os: OsInfo {
            name: System::name(),
            version: System::os_version(),
            kernel: System::kernel_version(),
        },
        uptime_secs: System::uptime(),
        cpu: host.cpu,
        memory: host.memory,
        disk: host.disk,
        app: AppInfo {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: state.started_at.elapsed().as_secs(),
        },
        containers: ContainersInfo {
            enabled: state.containers.is_some(),
            runtime,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_host_reports_cpus_and_memory() {
        let host = sample_host();
        assert!(host.cpu.count > 0);
        assert!(host.memory.total > 0);
        assert!(host.disk.available <= host.disk.total);
    }
}
