//! Container views returned by the API and the Engine API payloads they are
//! decoded from.

use serde::{Deserialize, Serialize};

/// Row in the container list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerSummary {
    pub id: String,
    pub name: String,
    pub image: String,
    pub state: String,
    pub status: String,
    /// Unix timestamp.
    pub created: i64,
}

/// Single container detail view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerDetails {
    pub id: String,
    pub name: String,
    pub image: String,
    pub created: String,
    pub state: ContainerState,
    pub restart_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerState {
    pub status: String,
    pub running: bool,
    pub exit_code: i64,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
}

/// Runtime identification for system info.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeVersion {
    #[serde(rename(deserialize = "Version"))]
    pub version: String,
    #[serde(rename(deserialize = "ApiVersion"))]
    pub api_version: String,
    #[serde(rename(deserialize = "Os"), default)]
    pub os: String,
    #[serde(rename(deserialize = "Arch"), default)]
    pub arch: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct EngineContainer {
    pub id: String,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created: i64,
}

impl From<EngineContainer> for ContainerSummary {
    fn from(c: EngineContainer) -> Self {
        let name = c
            .names
            .first()
            .map(|n| n.trim_start_matches('/').to_string())
            .unwrap_or_default();
        Self {
            id: c.id,
            name,
            image: c.image,
            state: c.state,
            status: c.status,
            created: c.created,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct EngineInspect {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub restart_count: i64,
    pub state: EngineState,
    pub config: Option<EngineConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct EngineState {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub exit_code: i64,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct EngineConfig {
    #[serde(default)]
    pub image: String,
}

/// The engine reports never-set times as the zero time.
fn non_zero_time(value: Option<String>) -> Option<String> {
    value.filter(|t| !t.starts_with("0001-01-01"))
}

impl From<EngineInspect> for ContainerDetails {
    fn from(c: EngineInspect) -> Self {
        Self {
            id: c.id,
            name: c.name.trim_start_matches('/').to_string(),
            image: c.config.map(|cfg| cfg.image).unwrap_or_default(),
            created: c.created,
            restart_count: c.restart_count,
            state: ContainerState {
                status: c.state.status,
                running: c.state.running,
                exit_code: c.state.exit_code,
                started_at: non_zero_time(c.state.started_at),
                finished_at: non_zero_time(c.state.finished_at),
            },
        }
    }
}

/// Which output stream a log line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    pub stream: LogStream,
    pub line: String,
}

/// Decode a logs response body into lines.
///
/// Containers without a TTY produce a multiplexed stream of frames, each with
/// an 8-byte header `[stream, 0, 0, 0, len_be32]`. TTY containers produce raw
/// text, reported as stdout.
pub fn decode_logs(body: &[u8]) -> Vec<LogLine> {
    let mut lines = Vec::new();

    if !is_multiplexed(body) {
        push_lines(&mut lines, LogStream::Stdout, body);
        return lines;
    }

    let mut rest = body;
    while rest.len() >= 8 {
        let stream = if rest[0] == 2 {
            LogStream::Stderr
        } else {
            LogStream::Stdout
        };
        let len = u32::from_be_bytes([rest[4], rest[5], rest[6], rest[7]]) as usize;
        let end = (8 + len).min(rest.len());
        push_lines(&mut lines, stream, &rest[8..end]);
        rest = &rest[end..];
    }
    lines
}

fn is_multiplexed(body: &[u8]) -> bool {
    body.len() >= 8 && body[0] <= 2 && body[1..4] == [0, 0, 0]
}

fn push_lines(lines: &mut Vec<LogLine>, stream: LogStream, chunk: &[u8]) {
    let text = String::from_utf8_lossy(chunk);
    lines.extend(
        text.lines()
            .filter(|l| !l.is_empty())
            .map(|l| LogLine {
                stream,
                line: l.to_string(),
            }),
    );
}
