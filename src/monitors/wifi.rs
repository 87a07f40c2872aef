use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info};

/// What the engine should do after a Wi-Fi repeater observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WifiDecision {
    /// Repeater is not running; nothing to track.
    NotRunning,
    /// First Running observation of a streak.
    Started,
    /// Running, still inside the allowed window.
    Running { elapsed: TimeDelta },
    /// Running for longer than allowed: stop it.
    Stop { elapsed: TimeDelta },
}

/// When the current Running streak was first observed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WifiMonitorState {
    pub started_at: Option<DateTime<Utc>>,
}

/// Stops the Wi-Fi repeater once it has been running longer than `max_runtime`.
///
/// A single not-running observation resets the streak.
pub struct WifiMonitor {
    max_runtime: TimeDelta,
    state: WifiMonitorState,
}

impl WifiMonitor {
    pub fn new(max_runtime: TimeDelta) -> Self {
        Self {
            max_runtime,
            state: WifiMonitorState::default(),
        }
    }

    pub fn state(&self) -> &WifiMonitorState {
        &self.state
    }

    /// Feed one observation of the repeater's run state.
    pub fn observe(&mut self, running: bool, now: DateTime<Utc>) -> WifiDecision {
        if !running {
            if self.state.started_at.take().is_some() {
                debug!("wifi-repeater no longer running, streak reset");
            }
            info!("wifi-repeater is not running");
            return WifiDecision::NotRunning;
        }

        let Some(started_at) = self.state.started_at else {
            self.state.started_at = Some(now);
            info!("wifi-repeater started");
            return WifiDecision::Started;
        };

        let elapsed = now - started_at;
        if elapsed > self.max_runtime {
            self.state.started_at = None;
            info!(
                elapsed_secs = elapsed.num_seconds(),
                "wifi-repeater past its runtime, stopping"
            );
            WifiDecision::Stop { elapsed }
        } else {
            info!(
                elapsed_secs = elapsed.num_seconds(),
                "wifi-repeater running"
            );
            WifiDecision::Running { elapsed }
        }
    }
}
