use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variables the device supervisor injects into every service.
pub const ENV_SUPERVISOR_ADDRESS: &str = "BALENA_SUPERVISOR_ADDRESS";
pub const ENV_SUPERVISOR_API_KEY: &str = "BALENA_SUPERVISOR_API_KEY";
pub const ENV_APP_ID: &str = "BALENA_APP_ID";
pub const ENV_APP_NAME: &str = "BALENA_APP_NAME";

/// Connection details for the local supervisor API, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorEnv {
    pub address: String,
    pub api_key: String,
    pub app_id: String,
    pub app_name: String,
}

impl SupervisorEnv {
    /// Read all four variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read all four variables through `lookup`. Absent or blank values are fatal.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &'static str| -> Result<String, ConfigError> {
            match lookup(name) {
                Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
                _ => Err(ConfigError::MissingEnv { name }),
            }
        };

        Ok(Self {
            address: require(ENV_SUPERVISOR_ADDRESS)?,
            api_key: require(ENV_SUPERVISOR_API_KEY)?,
            app_id: require(ENV_APP_ID)?,
            app_name: require(ENV_APP_NAME)?,
        })
    }
}

/// Top-level configuration loaded from boxwatch.toml.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct WatchdogConfig {
    pub engine: EngineConfig,
    pub wifi: WifiConfig,
    pub version: VersionConfig,
    pub internet: InternetConfig,
    pub audit: AuditConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub interval_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WifiConfig {
    pub service: String,
    pub max_runtime_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct VersionConfig {
    pub service: String,
    pub debounce_secs: u64,
    pub version_file: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct InternetConfig {
    pub host: String,
    pub grace_secs: u64,
    pub ping_command: String,
    pub ping_timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub log_file: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

// --- Default implementations ---

impl Default for EngineConfig {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            service: "wifi-repeater".to_string(),
            max_runtime_secs: 10 * 60,
        }
    }
}

impl Default for VersionConfig {
    fn default() -> Self {
        Self {
            service: "homeassistant".to_string(),
            debounce_secs: 2 * 60,
            version_file: PathBuf::from("/data/version.txt"),
        }
    }
}

impl Default for InternetConfig {
    fn default() -> Self {
        Self {
            host: "google.com".to_string(),
            grace_secs: 30 * 60,
            ping_command: "ping".to_string(),
            ping_timeout_secs: 1,
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_file: PathBuf::from("/data/restartLog.txt"),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

impl EngineConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

impl InternetConfig {
    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_secs.max(1))
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Errors that stop the watchdog from starting.
#[derive(Debug)]
pub enum ConfigError {
    /// A required environment variable is absent or blank.
    MissingEnv { name: &'static str },
    /// The config file exists but could not be read.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The config file is not valid TOML for this schema.
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingEnv { name } => {
                write!(f, "required environment variable {} is not set", name)
            }
            ConfigError::Read { path, source } => {
                write!(f, "failed to read config {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse config {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::MissingEnv { .. } => None,
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

/// Load the config file at `path`. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<WatchdogConfig, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(WatchdogConfig::default());
        }
        Err(e) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    toml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}
