use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

/// What the engine should do after comparing the running release to the stored one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionDecision {
    /// Same release as stored, or release unknown.
    Unchanged,
    /// A new release was seen recently; wait before acting.
    Debouncing { elapsed: TimeDelta },
    /// A new release has been live long enough: restart, then persist `to`.
    Restart { from: String, to: String },
}

/// Time of first detection for the pending release change. In memory only;
/// the release id itself lives in the version file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionMonitorState {
    pub change_detected_at: Option<DateTime<Utc>>,
}

/// Restarts the watched service once after each release change, after a
/// debounce window.
pub struct VersionMonitor {
    debounce: TimeDelta,
    state: VersionMonitorState,
}

impl VersionMonitor {
    pub fn new(debounce: TimeDelta) -> Self {
        Self {
            debounce,
            state: VersionMonitorState::default(),
        }
    }

    pub fn state(&self) -> &VersionMonitorState {
        &self.state
    }

    /// Forget the pending change so the next sighting debounces again.
    pub fn reset(&mut self) {
        self.state.change_detected_at = None;
    }

    /// Compare `fetched` (None when unknown) against the `persisted` release id.
    ///
    /// On `Restart` the detection time stays set; it clears on the first cycle
    /// that sees the persisted id match again.
    pub fn observe(
        &mut self,
        fetched: Option<&str>,
        persisted: &str,
        now: DateTime<Utc>,
    ) -> VersionDecision {
        debug!(current = persisted, fetched = ?fetched, "checking release");

        let fetched = match fetched {
            Some(v) if !v.is_empty() && v != persisted => v,
            _ => {
                self.state.change_detected_at = None;
                return VersionDecision::Unchanged;
            }
        };

        let detected_at = *self.state.change_detected_at.get_or_insert(now);
        let elapsed = now - detected_at;
        if elapsed < self.debounce {
            debug!(
                elapsed_secs = elapsed.num_seconds(),
                "release changed not long ago, not restarting yet"
            );
            return VersionDecision::Debouncing { elapsed };
        }

        debug!(new = fetched, "release change settled");
        VersionDecision::Restart {
            from: persisted.to_string(),
            to: fetched.to_string(),
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

    fn monitor() -> VersionMonitor {
        VersionMonitor::new(TimeDelta::minutes(2))
    }

    #[test]
    fn test_same_version_never_restarts() {
        let mut m = monitor();
        for i in 0..20 {
            assert_eq!(m.observe(Some("5"), "5", at(i * 30)), VersionDecision::Unchanged);
        }
        assert_eq!(m.state().change_detected_at, None);
    }

    #[test]
    fn test_unknown_version_is_unchanged_and_clears() {
        let mut m = monitor();
        m.observe(Some("6"), "5", at(0));
        assert!(m.state().change_detected_at.is_some());

        assert_eq!(m.observe(None, "5", at(30)), VersionDecision::Unchanged);
        assert_eq!(m.state().change_detected_at, None);
        assert_eq!(m.observe(Some(""), "5", at(60)), VersionDecision::Unchanged);
    }

    #[test]
    fn test_change_debounces_then_restarts() {
        let mut m = monitor();
        assert_eq!(
            m.observe(Some("6"), "5", at(0)),
            VersionDecision::Debouncing {
                elapsed: TimeDelta::zero()
            }
        );
        assert_eq!(
            m.observe(Some("6"), "5", at(60)),
            VersionDecision::Debouncing {
                elapsed: TimeDelta::seconds(60)
            }
        );
        assert_eq!(
            m.observe(Some("6"), "5", at(130)),
            VersionDecision::Restart {
                from: "5".to_string(),
                to: "6".to_string()
            }
        );
        // Detection time is kept after the restart decision.
        assert_eq!(m.state().change_detected_at, Some(at(0)));
    }

    #[test]
    fn test_restart_at_exact_debounce_boundary() {
        let mut m = monitor();
        m.observe(Some("6"), "5", at(0));
        assert!(matches!(
            m.observe(Some("6"), "5", at(120)),
            VersionDecision::Restart { .. }
        ));
    }

    #[test]
    fn test_persisted_match_clears_after_restart() {
        let mut m = monitor();
        m.observe(Some("6"), "5", at(0));
        m.observe(Some("6"), "5", at(130));
        // Engine persisted "6".
        assert_eq!(m.observe(Some("6"), "6", at(160)), VersionDecision::Unchanged);
        assert_eq!(m.state().change_detected_at, None);
    }

    #[test]
    fn test_first_install_with_empty_store_debounces() {
        let mut m = monitor();
        assert!(matches!(
            m.observe(Some("1"), "", at(0)),
            VersionDecision::Debouncing { .. }
        ));
        assert_eq!(
            m.observe(Some("1"), "", at(150)),
            VersionDecision::Restart {
                from: String::new(),
                to: "1".to_string()
            }
        );
    }

    #[test]
    fn test_reset_restarts_debounce() {
        let mut m = monitor();
        m.observe(Some("6"), "5", at(0));
        assert!(matches!(
            m.observe(Some("6"), "5", at(120)),
            VersionDecision::Restart { .. }
        ));

        m.reset();
        assert_eq!(m.state().change_detected_at, None);
        assert_eq!(
            m.observe(Some("6"), "5", at(150)),
            VersionDecision::Debouncing {
                elapsed: TimeDelta::zero()
            }
        );
        assert!(matches!(
            m.observe(Some("6"), "5", at(270)),
            VersionDecision::Restart { .. }
        ));
    }
}
