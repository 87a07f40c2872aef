use crate::indicator::{Channel, Indicators};
use crate::log_tailer::{scan_new_errors, LogCursor};
use boxwatch::ping::{HostTarget, Pinger, ProbeResult};
use std::time::Duration;

/// What one cycle observed.
#[derive(Debug)]
pub struct CycleReport {
    pub primary: ProbeResult,
    pub secondary: ProbeResult,
    /// None when no log file is tailed.
    pub new_error: Option<bool>,
}

/// Polls two hosts and, optionally, a log file; mirrors each onto an LED.
pub struct StatusLoop {
    pinger: Pinger,
    primary: HostTarget,
    secondary: HostTarget,
    cursor: Option<LogCursor>,
    indicators: Indicators,
}

impl StatusLoop {
    pub fn new(
        pinger: Pinger,
        primary: HostTarget,
        secondary: HostTarget,
        cursor: Option<LogCursor>,
        indicators: Indicators,
    ) -> Self {
        Self {
            pinger,
            primary,
            secondary,
            cursor,
            indicators,
        }
    }

    pub fn indicators(&self) -> &Indicators {
        &self.indicators
    }

    pub async fn tick(&mut self) -> CycleReport {
        let primary = self.pinger.probe_target(&self.primary).await;
        self.indicators.set(Channel::Primary, primary.reachable);

        let secondary = self.pinger.probe_target(&self.secondary).await;
        self.indicators.set(Channel::Secondary, secondary.reachable);

        let new_error = self.cursor.take().map(|cursor| {
            let found = match scan_new_errors(&cursor) {
                Ok((found, next)) => {
                    self.cursor = Some(next);
                    found
                }
                Err(e) => {
                    tracing::error!(
                        path = %cursor.file_path.display(),
                        error = %e,
                        "error reading log"
                    );
                    self.cursor = Some(cursor);
                    false
                }
            };
            self.indicators.set(Channel::Error, found);
            found
        });

        CycleReport {
            primary,
            secondary,
            new_error,
        }
    }

    /// Tick every `interval` until Ctrl-C.
    pub async fn run(&mut self, interval: Duration) {
        tracing::info!(
            primary = %self.primary.address,
            secondary = %self.secondary.address,
            log = ?self.cursor.as_ref().map(|c| c.file_path.display().to_string()),
            "status loop started"
        );
        loop {
            self.tick().await;
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("interrupt received, turning LEDs off");
                    self.indicators.set(Channel::Primary, false);
                    self.indicators.set(Channel::Secondary, false);
                    if self.cursor.is_some() {
                        self.indicators.set(Channel::Error, false);
                    }
                    return;
                }
            }
        }
    }
}
