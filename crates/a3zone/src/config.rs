//! Server configuration.
//!
//! [`ZoneConfig`] is read from a JSON file and then patched from the
//! environment. Every field has a default, so an empty `{}` (or no file
//! at all) is a valid configuration.
//!
//! ```json
//! {
//!   "server_name": "Project A3 Zone Server",
//!   "listen_port": 7777,
//!   "tick_rate_ms": 1000,
//!   "persistence_mode": "hybrid",
//!   "limits": { "auth_timeout_secs": 15 }
//! }
//! ```
//!
//! Numbers that are zero or negative fall back to their defaults instead
//! of failing the whole file.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use a3zone_session::{AuthLimiterConfig, DEFAULT_AUTH_SECRET};
use a3zone_store::PersistenceMode;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const ENV_PERSISTENCE_MODE: &str = "A3_PERSISTENCE_MODE";
pub const ENV_DATA_DIR: &str = "A3_DATA_DIR";
pub const ENV_AUTH_SECRET: &str = "A3_AUTH_SECRET";
pub const ENV_ENVIRONMENT: &str = "A3_ENV";

/// Problems that stop the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("auth secret must be set to a non-default value in {environment}")]
    InsecureSecret { environment: String },

    #[error("invalid bind address {host}:{port}")]
    BadBindAddress { host: String, port: u16 },
}

// ---------------------------------------------------------------------------
// Transport selection
// ---------------------------------------------------------------------------

/// Which listener the binary starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Newline-delimited JSON over plain TCP.
    #[default]
    Tcp,
    /// One JSON document per WebSocket message.
    Websocket,
}

// ---------------------------------------------------------------------------
// LimitsConfig
// ---------------------------------------------------------------------------

/// Rate limits, auth throttling and timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Commands per second before authentication.
    pub commands_per_sec_unauthenticated: i64,
    /// Commands per second once authenticated.
    pub commands_per_sec_authenticated: i64,
    /// Failed `AUTH_TOKEN` attempts before the connection is closed.
    pub max_auth_failures: i64,
    /// Backoff per failed attempt; the n-th failure waits n times this.
    pub auth_backoff_step_ms: i64,
    /// Attempts per address within `auth_window_secs`.
    pub auth_attempts_per_window: i64,
    pub auth_window_secs: i64,
    /// How long an address stays blocked after exhausting its attempts.
    pub auth_block_secs: i64,
    /// Read deadline while unauthenticated.
    pub auth_timeout_secs: i64,
    /// Largest displacement a single `MOVE` may cover.
    pub max_move_distance: f64,
    /// Largest accepted frame, in bytes.
    pub max_frame_bytes: i64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            commands_per_sec_unauthenticated: 12,
            commands_per_sec_authenticated: 60,
            max_auth_failures: 3,
            auth_backoff_step_ms: 150,
            auth_attempts_per_window: 10,
            auth_window_secs: 60,
            auth_block_secs: 120,
            auth_timeout_secs: 15,
            max_move_distance: 10.0,
            max_frame_bytes: 1024 * 1024,
        }
    }
}

/// `value` if positive, else `fallback`.
fn positive(value: i64, fallback: i64) -> i64 {
    if value > 0 { value } else { fallback }
}

fn to_u32(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

impl LimitsConfig {
    /// Replaces non-positive values with the defaults.
    pub fn normalized(self) -> Self {
        let d = Self::default();
        Self {
            commands_per_sec_unauthenticated: positive(
                self.commands_per_sec_unauthenticated,
                d.commands_per_sec_unauthenticated,
            ),
            commands_per_sec_authenticated: positive(
                self.commands_per_sec_authenticated,
                d.commands_per_sec_authenticated,
            ),
            max_auth_failures: positive(self.max_auth_failures, d.max_auth_failures),
            auth_backoff_step_ms: positive(self.auth_backoff_step_ms, d.auth_backoff_step_ms),
            auth_attempts_per_window: positive(
                self.auth_attempts_per_window,
                d.auth_attempts_per_window,
            ),
            auth_window_secs: positive(self.auth_window_secs, d.auth_window_secs),
            auth_block_secs: positive(self.auth_block_secs, d.auth_block_secs),
            auth_timeout_secs: positive(self.auth_timeout_secs, d.auth_timeout_secs),
            max_move_distance: if self.max_move_distance > 0.0 {
                self.max_move_distance
            } else {
                d.max_move_distance
            },
            max_frame_bytes: positive(self.max_frame_bytes, d.max_frame_bytes),
        }
    }

    pub fn command_limit(&self, authenticated: bool) -> u32 {
        if authenticated {
            to_u32(self.commands_per_sec_authenticated)
        } else {
            to_u32(self.commands_per_sec_unauthenticated)
        }
    }

    pub fn max_auth_failures(&self) -> u32 {
        to_u32(self.max_auth_failures)
    }

    pub fn auth_backoff_step(&self) -> Duration {
        Duration::from_millis(to_u64(self.auth_backoff_step_ms))
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(to_u64(self.auth_timeout_secs))
    }

    pub fn max_frame_len(&self) -> usize {
        usize::try_from(self.max_frame_bytes).unwrap_or(usize::MAX)
    }

    pub fn auth_limiter(&self) -> AuthLimiterConfig {
        AuthLimiterConfig {
            max_attempts: to_u32(self.auth_attempts_per_window),
            window: Duration::from_secs(to_u64(self.auth_window_secs)),
            block_for: Duration::from_secs(to_u64(self.auth_block_secs)),
        }
    }
}

// ---------------------------------------------------------------------------
// ZoneConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    pub server_name: String,
    pub listen_port: i64,
    pub bind_host: String,
    pub tick_rate_ms: i64,
    pub transport: TransportKind,
    /// `db`, `hybrid` or `json`. See [`PersistenceMode::parse`].
    pub persistence_mode: String,
    /// Holds the SQLite file and the `characters/` JSON directory.
    pub data_dir: PathBuf,
    #[serde(skip_serializing)]
    pub auth_secret: String,
    /// Deployment tag. `prod` and `production` require a real secret.
    pub environment: String,
    pub limits: LimitsConfig,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            server_name: Self::DEFAULT_SERVER_NAME.to_string(),
            listen_port: Self::DEFAULT_PORT,
            bind_host: "0.0.0.0".to_string(),
            tick_rate_ms: Self::DEFAULT_TICK_MS,
            transport: TransportKind::Tcp,
            persistence_mode: "db".to_string(),
            data_dir: PathBuf::from("data"),
            auth_secret: DEFAULT_AUTH_SECRET.to_string(),
            environment: "dev".to_string(),
            limits: LimitsConfig::default(),
        }
    }
}

impl ZoneConfig {
    pub const DEFAULT_SERVER_NAME: &'static str = "Project A3 Zone Server";
    pub const DEFAULT_PORT: i64 = 7777;
    pub const DEFAULT_TICK_MS: i64 = 1000;

    /// Reads `path`, falling back to defaults when the file is missing or
    /// is not valid config JSON. Environment overrides are not applied.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                info!(path = %path.display(), error = %e, "no config file, using defaults");
                return Self::default();
            }
        };
        match serde_json::from_str::<ZoneConfig>(&raw) {
            Ok(cfg) => cfg.normalized(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "invalid config file, using defaults");
                Self::default()
            }
        }
    }

    /// [`load`](Self::load) followed by the process environment.
    pub fn load_with_env(path: impl AsRef<Path>) -> Self {
        Self::load(path).with_env(|key| std::env::var(key).ok())
    }

    /// Applies `A3_*` overrides looked up through `lookup`. Blank values
    /// are ignored.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        if let Some(mode) = get(ENV_PERSISTENCE_MODE) {
            self.persistence_mode = mode;
        }
        if let Some(dir) = get(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(secret) = get(ENV_AUTH_SECRET) {
            self.auth_secret = secret;
        }
        if let Some(env) = get(ENV_ENVIRONMENT) {
            self.environment = env;
        }
        self
    }

    /// Replaces blank names and non-positive numbers with defaults.
    pub fn normalized(mut self) -> Self {
        if self.server_name.trim().is_empty() {
            self.server_name = Self::DEFAULT_SERVER_NAME.to_string();
        }
        if self.listen_port <= 0 || self.listen_port > i64::from(u16::MAX) {
            self.listen_port = Self::DEFAULT_PORT;
        }
        if self.tick_rate_ms <= 0 {
            self.tick_rate_ms = Self::DEFAULT_TICK_MS;
        }
        if self.bind_host.trim().is_empty() {
            self.bind_host = "0.0.0.0".to_string();
        }
        self.limits = self.limits.normalized();
        self
    }

    /// `true` for the `prod` / `production` environment tags.
    pub fn is_production(&self) -> bool {
        matches!(
            self.environment.trim().to_ascii_lowercase().as_str(),
            "prod" | "production"
        )
    }

    /// Refuses to run production with the shipped or an empty secret.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let secret = self.auth_secret.trim();
        if self.is_production() && (secret.is_empty() || secret == DEFAULT_AUTH_SECRET) {
            return Err(ConfigError::InsecureSecret {
                environment: self.environment.clone(),
            });
        }
        Ok(())
    }

    pub fn port(&self) -> u16 {
        u16::try_from(self.listen_port).unwrap_or(7777)
    }

    /// `bind_host:listen_port`, checked to parse as an address.
    pub fn bind_addr(&self) -> Result<String, ConfigError> {
        let host = self.bind_host.trim();
        host.parse::<IpAddr>().map_err(|_| ConfigError::BadBindAddress {
            host: host.to_string(),
            port: self.port(),
        })?;
        Ok(format!("{host}:{}", self.port()))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(to_u64(self.tick_rate_ms))
    }

    pub fn persistence(&self) -> PersistenceMode {
        PersistenceMode::parse(&self.persistence_mode)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    // =====================================================================
    // load()
    // =====================================================================

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ZoneConfig::load(dir.path().join("nope.json"));
        assert_eq!(cfg.listen_port, 7777);
        assert_eq!(cfg.tick_rate_ms, 1000);
        assert_eq!(cfg.server_name, "Project A3 Zone Server");
    }

    #[test]
    fn test_load_invalid_json_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let cfg = ZoneConfig::load(file.path());
        assert_eq!(cfg.listen_port, 7777);
    }

    #[test]
    fn test_load_partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"listen_port": 9000, "transport": "websocket", "limits": {{"auth_timeout_secs": 2}}}}"#
        )
        .unwrap();
        let cfg = ZoneConfig::load(file.path());
        assert_eq!(cfg.port(), 9000);
        assert_eq!(cfg.transport, TransportKind::Websocket);
        assert_eq!(cfg.limits.auth_timeout(), Duration::from_secs(2));
        assert_eq!(cfg.limits.command_limit(true), 60);
    }

    #[test]
    fn test_load_non_positive_numbers_fall_back() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"listen_port": -1, "tick_rate_ms": 0, "server_name": "", "limits": {{"max_move_distance": -3}}}}"#
        )
        .unwrap();
        let cfg = ZoneConfig::load(file.path());
        assert_eq!(cfg.listen_port, 7777);
        assert_eq!(cfg.tick_rate_ms, 1000);
        assert_eq!(cfg.server_name, ZoneConfig::DEFAULT_SERVER_NAME);
        assert_eq!(cfg.limits.max_move_distance, 10.0);
    }

    // =====================================================================
    // with_env()
    // =====================================================================

    #[test]
    fn test_with_env_overrides_fields() {
        let cfg = ZoneConfig::default().with_env(env(&[
            ("A3_PERSISTENCE_MODE", "json"),
            ("A3_DATA_DIR", "/tmp/a3"),
            ("A3_AUTH_SECRET", "s3cret"),
            ("A3_ENV", "production"),
        ]));
        assert_eq!(cfg.persistence(), PersistenceMode::Json);
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/a3"));
        assert_eq!(cfg.auth_secret, "s3cret");
        assert!(cfg.is_production());
    }

    #[test]
    fn test_with_env_blank_values_ignored() {
        let cfg = ZoneConfig::default().with_env(env(&[("A3_AUTH_SECRET", "   ")]));
        assert_eq!(cfg.auth_secret, DEFAULT_AUTH_SECRET);
    }

    // =====================================================================
    // validate()
    // =====================================================================

    #[test]
    fn test_validate_production_default_secret_refused() {
        let cfg = ZoneConfig::default().with_env(env(&[("A3_ENV", "prod")]));
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InsecureSecret { .. })
        ));
    }

    #[test]
    fn test_validate_production_empty_secret_refused() {
        let cfg = ZoneConfig {
            environment: "Production".into(),
            auth_secret: String::new(),
            ..ZoneConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_dev_default_secret_allowed() {
        assert!(ZoneConfig::default().validate().is_ok());
    }

    #[test]
    fn test_bind_addr_rejects_hostname() {
        let cfg = ZoneConfig {
            bind_host: "not an ip".into(),
            ..ZoneConfig::default()
        };
        assert!(cfg.bind_addr().is_err());
        assert_eq!(ZoneConfig::default().bind_addr().unwrap(), "0.0.0.0:7777");
    }
}
