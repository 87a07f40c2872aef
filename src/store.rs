/// Durable files kept by the watchdog across restarts.
///
/// - The version file holds the last release id acted on, nothing else.
/// - The audit log is append-only, one `<timestamp>: <message>` line per event.
use chrono::Local;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Errors reading or writing a durable file.
#[derive(Debug)]
pub enum StoreError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Read { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            StoreError::Write { path, source } => {
                write!(f, "failed to write {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Read { source, .. } => Some(source),
            StoreError::Write { source, .. } => Some(source),
        }
    }
}

/// Last known release id of the watched service.
#[derive(Debug, Clone)]
pub struct VersionStore {
    path: PathBuf,
}

impl VersionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the stored version. A file that does not exist yet reads as "".
    pub fn load(&self) -> Result<String, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(StoreError::Read {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    /// Replace the stored version.
    ///
    /// Writes a temporary file beside the target, then renames it over the
    /// target so a crash never leaves a half-written id behind.
    pub fn save(&self, version: &str) -> Result<(), StoreError> {
        let dir = self.path.parent().unwrap_or(Path::new("."));
        let tmp_path = dir.join(format!(".version.tmp.{}", std::process::id()));

        std::fs::write(&tmp_path, version.as_bytes()).map_err(|e| StoreError::Write {
            path: tmp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Write {
            path: self.path.clone(),
            source: e,
        })
    }
}

/// Human-readable record of automated actions.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamped line. The message is also logged at info.
    pub fn record(&self, message: &str) -> Result<(), StoreError> {
        tracing::info!("{message}");

        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S%.6f");
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::Write {
                path: self.path.clone(),
                source: e,
            })?;
        writeln!(file, "{stamp}: {message}").map_err(|e| StoreError::Write {
            path: self.path.clone(),
            source: e,
        })
    }
}
