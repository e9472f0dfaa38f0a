use shared::ip_filter::IpList;

use super::{AdmissionContext, Gate, GateOutcome};
use crate::config::IpFilterConfig;
use crate::error::{ApiError, StartupError};

fn access_denied() -> GateOutcome {
    GateOutcome::Terminate(axum::response::IntoResponse::into_response(
        ApiError::Forbidden("Access denied".into()),
    ))
}

/// Rejects clients matching any blacklist pattern.
#[derive(Debug)]
pub struct BlacklistGate {
    list: IpList,
}

impl BlacklistGate {
    pub fn new(list: IpList) -> Self {
        Self { list }
    }
}

#[async_trait::async_trait]
impl Gate for BlacklistGate {
    fn name(&self) -> &'static str {
        "ip_blacklist"
    }

    async fn evaluate(&self, ctx: &mut AdmissionContext<'_>) -> Result<GateOutcome, ApiError> {
        match ctx.client_ip {
            Some(ip) if self.list.contains(ip) => {
                tracing::info!(client_ip = %ip, path = %ctx.path, "Blocked blacklisted IP");
                Ok(access_denied())
            }
            _ => Ok(GateOutcome::Continue),
        }
    }
}

/// Rejects clients outside a non-empty whitelist. An empty whitelist admits everyone.
#[derive(Debug)]
pub struct WhitelistGate {
    list: IpList,
}

impl WhitelistGate {
    pub fn new(list: IpList) -> Self {
        Self { list }
    }
}

#[async_trait::async_trait]
impl Gate for WhitelistGate {
    fn name(&self) -> &'static str {
        "ip_whitelist"
    }

    async fn evaluate(&self, ctx: &mut AdmissionContext<'_>) -> Result<GateOutcome, ApiError> {
        if self.list.is_empty() {
            return Ok(GateOutcome::Continue);
        }
        match ctx.client_ip {
            Some(ip) if self.list.contains(ip) => Ok(GateOutcome::Continue),
            ip => {
                tracing::info!(client_ip = ?ip, path = %ctx.path, "Blocked IP outside whitelist");
                Ok(access_denied())
            }
        }
    }
}

/// Build the blacklist and whitelist from inline patterns and optional files.
pub fn load_ip_lists(config: &IpFilterConfig) -> Result<(IpList, IpList), StartupError> {
    let blacklist = load_list(&config.blacklist, config.blacklist_file.as_deref())?;
    let whitelist = load_list(&config.whitelist, config.whitelist_file.as_deref())?;
    Ok((blacklist, whitelist))
}

fn load_list(inline: &[String], file: Option<&str>) -> Result<IpList, StartupError> {
    let mut list = IpList::parse(inline)?;
    if let Some(path) = file.filter(|p| !p.is_empty()) {
        let contents = std::fs::read_to_string(path).map_err(|source| StartupError::ReadFile {
            path: path.to_string(),
            source,
        })?;
        list.extend(IpList::parse_lines(&contents)?);
    }
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, Method, StatusCode};
    use std::io::Write;
    use std::net::IpAddr;

    async fn outcome(gate: &dyn Gate, ip: Option<&str>) -> Option<StatusCode> {
        let headers = HeaderMap::new();
        let ip: Option<IpAddr> = ip.map(|s| s.parse().unwrap());
        let mut ctx = AdmissionContext::new(&Method::GET, "/api/system_info", &headers, ip);
        match gate.evaluate(&mut ctx).await.unwrap() {
            GateOutcome::Continue => None,
            GateOutcome::Terminate(response) => Some(response.status()),
        }
    }

    #[tokio::test]
    async fn test_blacklist_blocks_match() {
        let gate = BlacklistGate::new(IpList::parse(["10.0.0.5"]).unwrap());
        assert_eq!(
            outcome(&gate, Some("10.0.0.5")).await,
            Some(StatusCode::FORBIDDEN)
        );
        assert_eq!(outcome(&gate, Some("10.0.0.6")).await, None);
    }

    #[tokio::test]
    async fn test_blacklist_network() {
        let gate = BlacklistGate::new(IpList::parse(["192.168.0.0/16"]).unwrap());
        assert_eq!(
            outcome(&gate, Some("192.168.44.1")).await,
            Some(StatusCode::FORBIDDEN)
        );
    }

    #[tokio::test]
    async fn test_blacklist_unknown_ip_passes() {
        let gate = BlacklistGate::new(IpList::parse(["10.0.0.5"]).unwrap());
        assert_eq!(outcome(&gate, None).await, None);
    }

    #[tokio::test]
    async fn test_empty_whitelist_allows_all() {
        let gate = WhitelistGate::new(IpList::default());
        assert_eq!(outcome(&gate, Some("8.8.8.8")).await, None);
        assert_eq!(outcome(&gate, None).await, None);
    }

    #[tokio::test]
    async fn test_whitelist_blocks_outsiders() {
        let gate = WhitelistGate::new(IpList::parse(["10.0.0.0/8"]).unwrap());
        assert_eq!(outcome(&gate, Some("10.1.2.3")).await, None);
        assert_eq!(
            outcome(&gate, Some("8.8.8.8")).await,
            Some(StatusCode::FORBIDDEN)
        );
        assert_eq!(outcome(&gate, None).await, Some(StatusCode::FORBIDDEN));
    }

    #[test]
    fn test_load_lists_from_file() {
        let path = std::env::temp_dir().join(format!("coconut-blacklist-{}", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "# blocked hosts\n203.0.113.7\n198.51.100.0/24").unwrap();

        let config = IpFilterConfig {
            blacklist: vec!["10.0.0.5".to_string()],
            blacklist_file: Some(path.to_string_lossy().into_owned()),
            ..Default::default()
        };
        let (blacklist, whitelist) = load_ip_lists(&config).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(blacklist.len(), 3);
        assert!(blacklist.contains("198.51.100.9".parse().unwrap()));
        assert!(whitelist.is_empty());
    }

    #[test]
    fn test_load_lists_rejects_bad_pattern() {
        let config = IpFilterConfig {
            whitelist: vec!["10.0.0.0/99".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            load_ip_lists(&config),
            Err(StartupError::IpFilter(_))
        ));
    }

    #[test]
    fn test_load_lists_missing_file() {
        let config = IpFilterConfig {
            blacklist_file: Some("/nonexistent/coconut/blacklist.txt".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            load_ip_lists(&config),
            Err(StartupError::ReadFile { .. })
        ));
    }
}
