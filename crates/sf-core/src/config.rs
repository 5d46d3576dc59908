use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration loaded from `~/.sprintforge/config.toml`, with
/// `SPRINTFORGE_*` environment variables overriding individual leaf fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            tracker: TrackerConfig::default(),
            rate_limit: RateLimitConfig::default(),
            webhook: WebhookConfig::default(),
            audit: AuditConfig::default(),
            sync: SyncConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    /// Load config from `~/.sprintforge/config.toml`, falling back to
    /// defaults when the file does not exist, then apply environment
    /// overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        let mut cfg = if path.exists() {
            let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io(e.to_string()))?;
            toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?
        } else {
            Config::default()
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let mut cfg: Config = toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("SPRINTFORGE_TRACKER_BASE_URL") {
            self.tracker.base_url = v;
        }
        if let Ok(v) = std::env::var("SPRINTFORGE_TRACKER_TOKEN") {
            self.tracker.auth_token = Some(v);
        }
        if let Ok(v) = std::env::var("SPRINTFORGE_WEBHOOK_SECRET") {
            self.webhook.shared_secret = Some(v);
        }
        if let Ok(v) = std::env::var("SPRINTFORGE_ENCRYPTION_KEY") {
            self.general.encryption_key_hex = Some(v);
        }
        if let Ok(v) = std::env::var("SPRINTFORGE_LOG_LEVEL") {
            self.general.log_level = v;
        }
    }

    fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".sprintforge")
            .join("config.toml")
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(String),
    #[error("parse: {0}")]
    Parse(String),
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub encryption_key_hex: Option<String>,
    #[serde(default)]
    pub allowed_sso_domains: Vec<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            encryption_key_hex: None,
            allowed_sso_domains: Vec::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub auth_method: TrackerAuthMethod,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub oauth: Option<OAuthConfig>,
    #[serde(default)]
    pub cloud_hostname_suffix: Option<String>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            auth_method: TrackerAuthMethod::Token,
            auth_token: None,
            username: None,
            password: None,
            oauth: None,
            cloud_hostname_suffix: Some(".atlassian.net".into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrackerAuthMethod {
    #[default]
    Token,
    Basic,
    OAuth,
}

/// Converged OAuth configuration shape (spec §9 open question): one
/// provider-parameterized record rather than per-overload variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    pub authorization_url: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_rl_calls")]
    pub calls_per_window: u64,
    #[serde(default = "default_rl_window_secs")]
    pub window_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_secs")]
    pub retry_base_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            calls_per_window: default_rl_calls(),
            window_secs: default_rl_window_secs(),
            max_retries: default_max_retries(),
            retry_base_secs: default_retry_base_secs(),
        }
    }
}

fn default_rl_calls() -> u64 {
    100
}
fn default_rl_window_secs() -> u64 {
    60
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_base_secs() -> u64 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub shared_secret: Option<String>,
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            shared_secret: None,
            worker_pool_size: default_worker_pool_size(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_worker_pool_size() -> usize {
    4
}
fn default_max_attempts() -> u32 {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
    #[serde(default = "default_retention_sweep_secs")]
    pub retention_sweep_secs: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            retention_days: default_retention_days(),
            retention_sweep_secs: default_retention_sweep_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_retention_days() -> i64 {
    365
}
fn default_retention_sweep_secs() -> u64 {
    6 * 3600
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            sync_interval_secs: default_sync_interval_secs(),
        }
    }
}

fn default_batch_size() -> usize {
    100
}
fn default_sync_interval_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_path")]
    pub path: String,
    #[serde(default = "default_staleness_hours")]
    pub staleness_hours: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            staleness_hours: default_staleness_hours(),
        }
    }
}

fn default_cache_path() -> String {
    "~/.sprintforge/sprintforge.db".into()
}
fn default_staleness_hours() -> i64 {
    2
}
