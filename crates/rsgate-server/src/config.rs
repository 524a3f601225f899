//! Security service settings.
//!
//! Values are layered: built-in defaults, then an optional YAML file, then
//! `RSGATE_`-prefixed environment variables, each overriding the last.
//!
//! ```yaml
//! cache:
//!   membership_capacity: 50000
//!   fetch_timeout_ms: 250
//! permissions:
//!   admin_suffix: ADMIN
//! session:
//!   identity_attribute: userLoginId
//! ```

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use rsgate_domain::{CacheConfig, EvaluatorConfig, PermissionConvention};
use serde::{Deserialize, Serialize};

/// Security service configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct SecurityConfig {
    /// Cache sizing and fetch bounds
    #[serde(default)]
    pub cache: CacheSettings,

    /// Permission naming convention
    #[serde(default)]
    pub permissions: PermissionSettings,

    /// Session identity lookup
    #[serde(default)]
    pub session: SessionSettings,

    /// Storage settings
    #[serde(default)]
    pub storage: StorageSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Cache settings.
///
/// Neither cache expires entries by time; these only bound memory use and
/// the latency of a cold lookup.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CacheSettings {
    /// Maximum number of users whose group memberships are cached.
    #[serde(default = "default_capacity")]
    pub membership_capacity: u64,

    /// Maximum number of (group, permission) answers cached.
    #[serde(default = "default_capacity")]
    pub grant_capacity: u64,

    /// Upper bound on a single storage read, in milliseconds.
    /// Environment variable: `RSGATE_CACHE__FETCH_TIMEOUT_MS`
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            membership_capacity: default_capacity(),
            grant_capacity: default_capacity(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
        }
    }
}

fn default_capacity() -> u64 {
    100_000
}

fn default_fetch_timeout_ms() -> u64 {
    5_000
}

/// Permission naming settings.
///
/// # Example YAML Configuration
///
/// ```yaml
/// permissions:
///   separator: "_"
///   admin_suffix: ADMIN
///   admin_alias_enabled: true
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct PermissionSettings {
    /// Separator between entity and action (`ORDERMGR` + `_` + `VIEW`).
    #[serde(default = "default_separator")]
    pub separator: String,

    /// Action that grants every action on an entity.
    #[serde(default = "default_admin_suffix")]
    pub admin_suffix: String,

    /// Whether entity checks fall back to the admin alias.
    #[serde(default = "default_true")]
    pub admin_alias_enabled: bool,
}

impl Default for PermissionSettings {
    fn default() -> Self {
        Self {
            separator: default_separator(),
            admin_suffix: default_admin_suffix(),
            admin_alias_enabled: true,
        }
    }
}

fn default_separator() -> String {
    "_".to_string()
}

fn default_admin_suffix() -> String {
    "ADMIN".to_string()
}

fn default_true() -> bool {
    true
}

/// Session settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SessionSettings {
    /// Session attribute holding the logged-in user's id.
    #[serde(default = "default_identity_attribute")]
    pub identity_attribute: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            identity_attribute: default_identity_attribute(),
        }
    }
}

fn default_identity_attribute() -> String {
    "userLoginId".to_string()
}

/// Storage backend settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StorageSettings {
    /// Storage backend type. Only "memory" is built in.
    #[serde(default = "default_storage_backend")]
    pub backend: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
        }
    }
}

fn default_storage_backend() -> String {
    "memory".to_string()
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// One of [`LOG_LEVELS`], case-insensitive.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// One JSON object per line instead of pretty output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Settings could not be read or are unusable.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

const ENV_PREFIX: &str = "RSGATE";

/// Accepted values of `storage.backend`.
pub const SUPPORTED_BACKENDS: &[&str] = &["memory"];

/// Accepted values of `logging.level`.
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl SecurityConfig {
    /// Reads `path` as YAML, then applies environment overrides.
    ///
    /// Overrides use `__` between levels, e.g.
    /// `RSGATE_CACHE__FETCH_TIMEOUT_MS=250` or
    /// `RSGATE_SESSION__IDENTITY_ATTRIBUTE=userId`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        Self::layered(Some(path))
    }

    /// Defaults plus environment overrides, no file.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        Self::layered(None)
    }

    fn layered(file: Option<&Path>) -> Result<Self, ConfigLoadError> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);
        if let Some(path) = file {
            builder = builder.add_source(File::from(path).format(FileFormat::Yaml));
        }
        let loaded: Self = builder.add_source(env_source()).build()?.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Rejects settings a service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.cache.membership_capacity == 0 || self.cache.grant_capacity == 0 {
            return Err(invalid("cache capacities must be greater than 0"));
        }

        if self.cache.fetch_timeout_ms == 0 {
            return Err(invalid("cache.fetch_timeout_ms must be greater than 0"));
        }

        if self.permissions.admin_suffix.trim().is_empty() {
            return Err(invalid("permissions.admin_suffix must not be empty"));
        }

        if self.session.identity_attribute.trim().is_empty() {
            return Err(invalid("session.identity_attribute must not be empty"));
        }

        if !SUPPORTED_BACKENDS.contains(&self.storage.backend.as_str()) {
            return Err(invalid(format!(
                "unsupported storage.backend {:?} (supported: {})",
                self.storage.backend,
                SUPPORTED_BACKENDS.join(", ")
            )));
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(invalid(format!(
                "unknown logging.level {:?} (expected one of: {})",
                self.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }

    /// Cache sizing for the domain caches.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::default()
            .with_membership_capacity(self.cache.membership_capacity)
            .with_grant_capacity(self.cache.grant_capacity)
    }

    /// Evaluator settings: naming convention and fetch timeout.
    pub fn evaluator_config(&self) -> EvaluatorConfig {
        let convention = PermissionConvention::default()
            .with_separator(self.permissions.separator.clone())
            .with_admin_suffix(self.permissions.admin_suffix.clone())
            .with_admin_alias(self.permissions.admin_alias_enabled);

        EvaluatorConfig::default()
            .with_convention(convention)
            .with_fetch_timeout(Duration::from_millis(self.cache.fetch_timeout_ms))
    }
}

// RSGATE_CACHE__GRANT_CAPACITY -> cache.grant_capacity
fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

fn invalid(message: impl Into<String>) -> ConfigLoadError {
    ConfigLoadError::Invalid {
        message: message.into(),
    }
}
