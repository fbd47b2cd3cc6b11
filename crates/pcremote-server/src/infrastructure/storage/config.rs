//! TOML-based configuration for the host server.
//!
//! Reads and writes `ServerConfig` at the platform-appropriate path:
//! - Windows:  `%APPDATA%\PCRemote\config.toml`
//! - Linux:    `~/.config/pcremote/config.toml`
//! - macOS:    `~/Library/Application Support/PCRemote/config.toml`
//!
//! A different file can be given with `--config <path>`.
//!
//! # What is TOML? (for beginners)
//!
//! TOML (Tom's Obvious Minimal Language) is a configuration file format designed
//! to be easy to read and write.  Example:
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0"
//! http_port = 8000
//!
//! [security]
//! pairing_code_ttl_secs = 300
//! ```
//!
//! # Serde default values
//!
//! Every field is annotated with `#[serde(default = "some_fn")]` and every
//! section with `#[serde(default)]`, so a missing file, a missing section or a
//! missing key all fall back to the built-in defaults.  An operator only
//! writes the keys they want to change.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use chrono::Duration;
use pcremote_core::session::MAX_TIMEOUT_SECS;
use pcremote_core::{NonceLedgerConfig, PairingConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value parsed but makes no sense (zero port, zero interval, a TTL
    /// past the allowed maximum).
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: HttpSettings,
    #[serde(default)]
    pub discovery: DiscoverySettings,
    #[serde(default)]
    pub security: SecuritySettings,
    #[serde(default)]
    pub sessions: SessionSettings,
    #[serde(default)]
    pub metrics: MetricsSettings,
}

/// HTTP listener and logging.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HttpSettings {
    /// IP address to bind the HTTP listener to.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// TCP port for the HTTP API.  Also advertised in discovery replies.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// UDP discovery responder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoverySettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// UDP port the beacon listener binds to.
    #[serde(default = "default_discovery_port")]
    pub port: u16,
    /// Delay before rebinding after the socket fails.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

/// Pairing, token and replay-protection lifetimes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecuritySettings {
    #[serde(default = "default_pairing_code_ttl_secs")]
    pub pairing_code_ttl_secs: u64,
    #[serde(default = "default_code_rotation_interval_secs")]
    pub code_rotation_interval_secs: u64,
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
    #[serde(default = "default_nonce_ttl_secs")]
    pub nonce_ttl_secs: u64,
    /// Maximum distance between `X-Timestamp` and the host clock.
    #[serde(default = "default_timestamp_window_secs")]
    pub timestamp_window_secs: u64,
}

/// Focus-session defaults and housekeeping cadence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSettings {
    /// Timeout used when `/session/start` does not send `timeoutSeconds`.
    #[serde(default = "default_session_timeout_secs")]
    pub default_timeout_secs: i64,
    /// How often expired sessions, tokens and nonces are swept.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

/// Host metrics sampler behind `/system/status` and `/system/metrics`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds between two samples.
    #[serde(default = "default_sample_interval_secs")]
    pub sample_interval_secs: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8000
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_discovery_port() -> u16 {
    9999
}
fn default_retry_delay_secs() -> u64 {
    5
}
fn default_pairing_code_ttl_secs() -> u64 {
    5 * 60
}
fn default_code_rotation_interval_secs() -> u64 {
    5 * 60
}
fn default_token_ttl_secs() -> u64 {
    30 * 24 * 60 * 60
}
fn default_nonce_ttl_secs() -> u64 {
    5 * 60
}
fn default_timestamp_window_secs() -> u64 {
    60
}
fn default_session_timeout_secs() -> i64 {
    15 * 60
}
fn default_sweep_interval_secs() -> u64 {
    30
}
fn default_sample_interval_secs() -> u64 {
    1
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            http_port: default_http_port(),
            log_level: default_log_level(),
        }
    }
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            port: default_discovery_port(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            pairing_code_ttl_secs: default_pairing_code_ttl_secs(),
            code_rotation_interval_secs: default_code_rotation_interval_secs(),
            token_ttl_secs: default_token_ttl_secs(),
            nonce_ttl_secs: default_nonce_ttl_secs(),
            timestamp_window_secs: default_timestamp_window_secs(),
        }
    }
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            sample_interval_secs: default_sample_interval_secs(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_session_timeout_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

// ── Limits ────────────────────────────────────────────────────────────────────

/// Longest accepted token lifetime: ten years.
pub const MAX_TOKEN_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Longest accepted code/nonce lifetime, timestamp window and loop interval:
/// one day.
pub const MAX_SHORT_SECS: u64 = 24 * 60 * 60;

// ── Derived values ────────────────────────────────────────────────────────────

impl ServerConfig {
    /// Rejects values that parse but cannot work.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str| Err(ConfigError::Invalid(format!("{key} must be greater than zero")));
        let too_large = |key: &str, max: u64| {
            Err(ConfigError::Invalid(format!("{key} must be at most {max} seconds")))
        };

        if self.server.http_port == 0 {
            return invalid("server.http_port");
        }
        if self.discovery.port == 0 {
            return invalid("discovery.port");
        }

        let sec = &self.security;
        for (key, value, max) in [
            ("discovery.retry_delay_secs", self.discovery.retry_delay_secs, MAX_SHORT_SECS),
            ("security.pairing_code_ttl_secs", sec.pairing_code_ttl_secs, MAX_SHORT_SECS),
            ("security.code_rotation_interval_secs", sec.code_rotation_interval_secs, MAX_SHORT_SECS),
            ("security.token_ttl_secs", sec.token_ttl_secs, MAX_TOKEN_TTL_SECS),
            ("security.nonce_ttl_secs", sec.nonce_ttl_secs, MAX_SHORT_SECS),
            ("security.timestamp_window_secs", sec.timestamp_window_secs, MAX_SHORT_SECS),
            ("sessions.sweep_interval_secs", self.sessions.sweep_interval_secs, MAX_SHORT_SECS),
            ("metrics.sample_interval_secs", self.metrics.sample_interval_secs, MAX_SHORT_SECS),
        ] {
            if value == 0 {
                return invalid(key);
            }
            if value > max {
                return too_large(key, max);
            }
        }

        let timeout = self.sessions.default_timeout_secs;
        if timeout <= 0 {
            return invalid("sessions.default_timeout_secs");
        }
        if timeout > MAX_TIMEOUT_SECS {
            return too_large("sessions.default_timeout_secs", MAX_TIMEOUT_SECS as u64);
        }
        self.http_addr().map(|_| ())
    }

    /// The socket address the HTTP listener binds to.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `bind_address` is not an IP address.
    pub fn http_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.server.bind_address.parse().map_err(|_| {
            ConfigError::Invalid(format!(
                "server.bind_address '{}' is not an IP address",
                self.server.bind_address
            ))
        })?;
        Ok(SocketAddr::new(ip, self.server.http_port))
    }

    pub fn pairing_config(&self) -> PairingConfig {
        PairingConfig {
            code_ttl: seconds(self.security.pairing_code_ttl_secs),
            token_ttl: seconds(self.security.token_ttl_secs),
        }
    }

    pub fn nonce_config(&self) -> NonceLedgerConfig {
        NonceLedgerConfig {
            timestamp_window: seconds(self.security.timestamp_window_secs),
            nonce_ttl: seconds(self.security.nonce_ttl_secs),
        }
    }
}

fn seconds(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `ServerConfig` from `path`, returning the defaults if the file does
/// not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<ServerConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ServerConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Loads `ServerConfig` from the platform config path.
///
/// A host without a resolvable config directory (a stripped container, for
/// example) runs on defaults.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<ServerConfig, ConfigError> {
    match config_file_path() {
        Ok(path) => load_config_from(&path),
        Err(ConfigError::NoPlatformConfigDir) => Ok(ServerConfig::default()),
        Err(e) => Err(e),
    }
}

/// Writes `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &ServerConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config directory including the `PCRemote` subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("PCRemote"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("pcremote"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("PCRemote")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
