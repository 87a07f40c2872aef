use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

/// What the engine should do after an internet reachability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternetDecision {
    Up,
    /// Unreachable, still inside the grace window.
    Down { elapsed: TimeDelta },
    /// Unreachable for longer than the grace window: reboot the device.
    Reboot { elapsed: TimeDelta },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternetMonitorState {
    pub last_reachable_at: DateTime<Utc>,
}

/// Reboots the device after a prolonged internet outage.
///
/// Any successful probe resets the clock. The state is not reset after a
/// reboot decision; the device is expected to go down.
pub struct InternetMonitor {
    grace: TimeDelta,
    state: InternetMonitorState,
}

impl InternetMonitor {
    /// `started_at` counts as the last time the internet was reachable.
    pub fn new(grace: TimeDelta, started_at: DateTime<Utc>) -> Self {
        Self {
            grace,
            state: InternetMonitorState {
                last_reachable_at: started_at,
            },
        }
    }

    pub fn state(&self) -> &InternetMonitorState {
        &self.state
    }

    pub fn observe(&mut self, reachable: bool, now: DateTime<Utc>) -> InternetDecision {
        if reachable {
            debug!("internet up");
            self.state.last_reachable_at = now;
            return InternetDecision::Up;
        }

        let elapsed = now - self.state.last_reachable_at;
        debug!(
            last_seen = %self.state.last_reachable_at,
            elapsed_secs = elapsed.num_seconds(),
            "internet down"
        );
        if elapsed > self.grace {
            InternetDecision::Reboot { elapsed }
        } else {
            InternetDecision::Down { elapsed }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap() + TimeDelta::seconds(secs)
    }

    fn monitor() -> InternetMonitor {
        InternetMonitor::new(TimeDelta::minutes(30), at(0))
    }

    #[test]
    fn test_reachable_updates_last_seen() {
        let mut m = monitor();
        assert_eq!(m.observe(true, at(90)), InternetDecision::Up);
        assert_eq!(m.state().last_reachable_at, at(90));
    }

    #[test]
    fn test_outage_within_grace_waits() {
        let mut m = monitor();
        assert_eq!(
            m.observe(false, at(1800)),
            InternetDecision::Down {
                elapsed: TimeDelta::seconds(1800)
            }
        );
    }

    #[test]
    fn test_reboot_only_strictly_past_grace() {
        let mut m = monitor();
        assert!(matches!(m.observe(false, at(1800)), InternetDecision::Down { .. }));
        assert_eq!(
            m.observe(false, at(1801)),
            InternetDecision::Reboot {
                elapsed: TimeDelta::seconds(1801)
            }
        );
        // Not reset; keeps asking while the device stays up.
        assert!(matches!(m.observe(false, at(1831)), InternetDecision::Reboot { .. }));
    }

    #[test]
    fn test_any_success_resets_the_clock() {
        let mut m = monitor();
        let mut reboots = 0;
        // Down for 20 minutes, one success, down for another 20 minutes.
        for i in 0..40 {
            if matches!(m.observe(false, at(i * 30)), InternetDecision::Reboot { .. }) {
                reboots += 1;
            }
        }
        m.observe(true, at(1200));
        for i in 41..81 {
            if matches!(m.observe(false, at(i * 30)), InternetDecision::Reboot { .. }) {
                reboots += 1;
            }
        }
        assert_eq!(reboots, 0);
    }
}
