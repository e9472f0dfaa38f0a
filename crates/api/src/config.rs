use serde::Deserialize;

/// Defaults shipped with the binary; `config/default.toml` on disk takes the same shape.
const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

/// Minimum secret key length for CSRF signing.
const MIN_SECRET_KEY_LENGTH: usize = 32;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    #[serde(default)]
    pub ip_filter: IpFilterConfig,
    #[serde(default)]
    pub containers: ContainerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Raises the default log level to debug.
    #[serde(default)]
    pub debug: bool,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_static_dir")]
    pub static_dir: String,

    /// URL prefix static assets are served under.
    #[serde(default = "default_static_prefix")]
    pub static_prefix: String,

    /// Directory holding index.html, login.html and setup.html.
    #[serde(default = "default_pages_dir")]
    pub pages_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl From<&DatabaseConfig> for persistence::db::DatabaseConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            connect_timeout_secs: config.connect_timeout_secs,
            idle_timeout_secs: config.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rotated log files. Empty disables file output.
    #[serde(default)]
    pub file_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Key for signing CSRF tokens.
    pub secret_key: String,

    /// `*` or a comma-separated list of origins.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: String,

    /// Rate limit spec, e.g. `"200 per minute; 5000 per day"`.
    #[serde(default)]
    pub rate_limit: String,

    /// Take the client IP from proxy headers instead of the socket peer.
    #[serde(default)]
    pub trust_proxy_headers: bool,

    #[serde(default = "default_csp")]
    pub content_security_policy: String,

    #[serde(default = "default_frame_options")]
    pub frame_options: String,

    #[serde(default = "default_true")]
    pub csrf_enabled: bool,

    #[serde(default = "default_csrf_time_limit")]
    pub csrf_time_limit_secs: u64,

    #[serde(default)]
    pub session_cookie_secure: bool,

    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: i64,

    #[serde(default = "default_login_exempt_paths")]
    pub login_exempt_paths: Vec<String>,

    #[serde(default = "default_setup_exempt_paths")]
    pub setup_exempt_paths: Vec<String>,

    #[serde(default)]
    pub csrf_exempt_paths: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IpFilterConfig {
    #[serde(default)]
    pub blacklist: Vec<String>,

    #[serde(default)]
    pub whitelist: Vec<String>,

    #[serde(default)]
    pub blacklist_file: Option<String>,

    #[serde(default)]
    pub whitelist_file: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContainerConfig {
    /// Probe the container runtime at startup.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// `unix:///path/to/docker.sock` or `tcp://host:port`.
    #[serde(default = "default_container_host")]
    pub host: String,

    #[serde(default = "default_container_timeout")]
    pub timeout_secs: u64,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_container_host(),
            timeout_secs: default_container_timeout(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5000
}
fn default_request_timeout() -> u64 {
    30
}
fn default_static_dir() -> String {
    "static".to_string()
}
fn default_static_prefix() -> String {
    "/static".to_string()
}
fn default_pages_dir() -> String {
    "pages".to_string()
}
fn default_max_connections() -> u32 {
    10
}
fn default_min_connections() -> u32 {
    1
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}
fn default_allowed_origins() -> String {
    "*".to_string()
}
fn default_csp() -> String {
    "default-src 'self'".to_string()
}
fn default_frame_options() -> String {
    "DENY".to_string()
}
fn default_true() -> bool {
    true
}
fn default_csrf_time_limit() -> u64 {
    3600
}
fn default_session_ttl() -> i64 {
    43200 // 12 hours
}
fn default_login_exempt_paths() -> Vec<String> {
    ["/auth/login", "/setup", "/api/csrf-token", "/api/health"]
        .map(String::from)
        .to_vec()
}
fn default_setup_exempt_paths() -> Vec<String> {
    ["/setup", "/api/csrf-token", "/api/health"]
        .map(String::from)
        .to_vec()
}
fn default_container_host() -> String {
    "unix:///var/run/docker.sock".to_string()
}
fn default_container_timeout() -> u64 {
    5
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Keys whose environment values are comma-separated lists.
const LIST_KEYS: &[&str] = &[
    "ip_filter.blacklist",
    "ip_filter.whitelist",
    "security.login_exempt_paths",
    "security.setup_exempt_paths",
    "security.csrf_exempt_paths",
];

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. built-in defaults
    /// 2. config/default.toml (optional)
    /// 3. config/local.toml (optional, not in git)
    /// 4. Environment variables with COCONUT__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let mut env = config::Environment::with_prefix("COCONUT")
            .separator("__")
            .try_parsing(true)
            .list_separator(",");
        for key in LIST_KEYS {
            env = env.with_list_parse_key(key);
        }

        let config = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(env)
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Build a config from the built-in defaults plus explicit overrides,
    /// without touching the file system or environment.
    ///
    /// Validation is skipped so tests can build partial configs.
    pub fn from_defaults(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "COCONUT__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.security.secret_key.len() < MIN_SECRET_KEY_LENGTH {
            return Err(ConfigValidationError::MissingRequired(format!(
                "COCONUT__SECURITY__SECRET_KEY must be set to at least {} characters",
                MIN_SECRET_KEY_LENGTH
            )));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if self.security.session_ttl_secs <= 0 {
            return Err(ConfigValidationError::InvalidValue(
                "session_ttl_secs must be positive".to_string(),
            ));
        }

        if !self.server.static_prefix.starts_with('/') || self.server.static_prefix == "/" {
            return Err(ConfigValidationError::InvalidValue(format!(
                "static_prefix must start with '/' and not be the root: {}",
                self.server.static_prefix
            )));
        }

        self.frame_options()?;

        Ok(())
    }

    /// Normalized X-Frame-Options value.
    pub fn frame_options(&self) -> Result<&'static str, ConfigValidationError> {
        match self.security.frame_options.to_ascii_uppercase().as_str() {
            "DENY" => Ok("DENY"),
            "SAMEORIGIN" => Ok("SAMEORIGIN"),
            other => Err(ConfigValidationError::InvalidValue(format!(
                "frame_options must be DENY or SAMEORIGIN, got '{}'",
                other
            ))),
        }
    }

    /// Log filter directive, accounting for the debug flag.
    pub fn effective_log_level(&self) -> &str {
        if self.server.debug && self.logging.level == default_log_level() {
            "debug"
        } else {
            &self.logging.level
        }
    }
}
