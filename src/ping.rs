/// Host reachability via a single ICMP echo request.
///
/// Shells out to the system `ping` binary (`ping -c 1 -W <secs> <address>`).
/// An unreachable host is a normal `Ok(false)`; only a malformed invocation
/// (empty address, missing binary) is an error.
use chrono::{DateTime, Utc};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Extra time granted on top of the echo timeout before the probe is abandoned
/// (covers name resolution, which `-W` does not bound).
const SPAWN_GRACE: Duration = Duration::from_secs(2);

/// A named host to probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostTarget {
    pub name: String,
    pub address: String,
}

impl HostTarget {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

/// Outcome of probing one target in one poll cycle.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub target: HostTarget,
    pub reachable: bool,
    pub timestamp: DateTime<Utc>,
}

/// Errors from an invalid probe invocation.
#[derive(Debug)]
pub enum PingError {
    /// No address was given.
    EmptyAddress,
    /// The ping binary could not be started.
    Spawn {
        command: String,
        source: std::io::Error,
    },
}

impl std::fmt::Display for PingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PingError::EmptyAddress => write!(f, "ping target address is empty"),
            PingError::Spawn { command, source } => {
                write!(f, "failed to spawn `{}`: {}", command, source)
            }
        }
    }
}

impl std::error::Error for PingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PingError::EmptyAddress => None,
            PingError::Spawn { source, .. } => Some(source),
        }
    }
}

/// How to run a probe: which binary, and how long to wait for the echo reply.
#[derive(Debug, Clone)]
pub struct Pinger {
    command: String,
    timeout: Duration,
}

impl Pinger {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }

    /// Send one echo request to `address`. Returns true iff it was answered.
    pub async fn probe(&self, address: &str) -> Result<bool, PingError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(PingError::EmptyAddress);
        }

        let wait_secs = self.timeout.as_secs().max(1);
        let mut child = Command::new(&self.command)
            .args(["-c", "1", "-W", &wait_secs.to_string(), address])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PingError::Spawn {
                command: self.command.clone(),
                source: e,
            })?;

        match tokio::time::timeout(self.timeout + SPAWN_GRACE, child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(address, success = status.success(), "ping finished");
                Ok(status.success())
            }
            Ok(Err(e)) => {
                tracing::debug!(address, error = %e, "failed waiting for ping");
                Ok(false)
            }
            Err(_) => {
                tracing::debug!(address, "ping timed out");
                Ok(false)
            }
        }
    }

    /// Probe a target and stamp the outcome. Invocation errors count as unreachable.
    pub async fn probe_target(&self, target: &HostTarget) -> ProbeResult {
        let reachable = match self.probe(&target.address).await {
            Ok(reachable) => reachable,
            Err(e) => {
                tracing::warn!(host = %target.name, error = %e, "probe failed");
                false
            }
        };
        ProbeResult {
            target: target.clone(),
            reachable,
            timestamp: Utc::now(),
        }
    }
}

impl Default for Pinger {
    fn default() -> Self {
        Self::new("ping", Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pinger(command: &str) -> Pinger {
        Pinger::new(command, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_successful_exit_is_reachable() {
        assert!(pinger("true").probe("172.18.4.2").await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_exit_is_unreachable_not_error() {
        assert!(!pinger("false").probe("8.8.8.8").await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_address_is_error() {
        let err = pinger("true").probe("   ").await.unwrap_err();
        assert!(matches!(err, PingError::EmptyAddress));
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let err = pinger("nonexistent-ping-binary-xyz")
            .probe("8.8.8.8")
            .await
            .unwrap_err();
        assert!(matches!(err, PingError::Spawn { .. }));
        assert!(err.to_string().contains("nonexistent-ping-binary-xyz"));
    }

    #[tokio::test]
    async fn test_probe_target_stamps_result() {
        let target = HostTarget::new("dns", "8.8.8.8");
        let result = pinger("nonexistent-ping-binary-xyz")
            .probe_target(&target)
            .await;
        assert_eq!(result.target, target);
        assert!(!result.reachable);
    }
}
