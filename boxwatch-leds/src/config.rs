use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct LedConfig {
    #[serde(default)]
    pub gpio: GpioConfig,
    #[serde(default)]
    pub hosts: HostsConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default, rename = "loop")]
    pub poll: PollConfig,
}

/// GPIO character device and BCM line offsets for each LED.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GpioConfig {
    #[serde(default = "default_chip")]
    pub chip: PathBuf,
    #[serde(default = "default_primary_pin")]
    pub primary_pin: u32,
    #[serde(default = "default_secondary_pin")]
    pub secondary_pin: u32,
    #[serde(default = "default_error_pin")]
    pub error_pin: u32,
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            chip: default_chip(),
            primary_pin: default_primary_pin(),
            secondary_pin: default_secondary_pin(),
            error_pin: default_error_pin(),
        }
    }
}

fn default_chip() -> PathBuf {
    PathBuf::from("/dev/gpiochip0")
}
fn default_primary_pin() -> u32 {
    17
}
fn default_secondary_pin() -> u32 {
    27
}
fn default_error_pin() -> u32 {
    22
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HostsConfig {
    #[serde(default = "default_primary_host")]
    pub primary: String,
    #[serde(default = "default_secondary_host")]
    pub secondary: String,
}

impl Default for HostsConfig {
    fn default() -> Self {
        Self {
            primary: default_primary_host(),
            secondary: default_secondary_host(),
        }
    }
}

fn default_primary_host() -> String {
    "172.18.4.2".to_string()
}
fn default_secondary_host() -> String {
    "8.8.8.8".to_string()
}

/// Log file scanned for new ERROR lines. Without one, the error LED is unused.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct LogConfig {
    #[serde(default)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PollConfig {
    /// Seconds between cycles; defaults to 2 with a log file, 1 without.
    #[serde(default)]
    pub interval_secs: Option<u64>,
    #[serde(default = "default_ping_command")]
    pub ping_command: String,
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: None,
            ping_command: default_ping_command(),
            ping_timeout_secs: default_ping_timeout(),
        }
    }
}

fn default_ping_command() -> String {
    "ping".to_string()
}
fn default_ping_timeout() -> u64 {
    1
}

impl LedConfig {
    /// The tailed log file, if the error LED is in use.
    pub fn error_log(&self) -> Option<&Path> {
        self.log.file.as_deref()
    }

    /// GPIO line for the error LED; only claimed when a log is tailed.
    pub fn error_pin(&self) -> Option<u32> {
        self.error_log().map(|_| self.gpio.error_pin)
    }

    /// Poll period for the configured variant.
    pub fn interval(&self) -> Duration {
        let secs = match (self.poll.interval_secs, self.log.file.is_some()) {
            (Some(secs), _) => secs.max(1),
            (None, true) => 2,
            (None, false) => 1,
        };
        Duration::from_secs(secs)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.poll.ping_timeout_secs.max(1))
    }
}

/// Load config from `path`, or defaults. A bad file is logged, never fatal:
/// the lights keep working on defaults.
pub fn load_config(path: &Path) -> LedConfig {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!("failed to parse {}: {e}", path.display());
                LedConfig::default()
            }
        },
        Err(_) => LedConfig::default(),
    }
}
