/// The watchdog loop: one tick runs the Wi-Fi repeater, release and internet
/// checks in order, each independent of the others' failures.
use crate::config::{SupervisorEnv, WatchdogConfig};
use crate::monitors::{
    InternetDecision, InternetMonitor, VersionDecision, VersionMonitor, WifiDecision, WifiMonitor,
};
use crate::ping::Pinger;
use crate::store::{AuditLog, VersionStore};
use crate::supervisor::{release_id, DeviceStatus, SupervisorClient};
use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;
use tracing::{error, info, warn};

fn secs(value: u64) -> TimeDelta {
    let value = i64::try_from(value).unwrap_or(i64::MAX).min(i64::MAX / 1000);
    TimeDelta::seconds(value)
}

/// Owns the supervisor client, the three monitors and the durable files.
pub struct WatchdogEngine {
    client: SupervisorClient,
    app_name: String,
    wifi_service: String,
    hass_service: String,
    internet_host: String,
    pinger: Pinger,
    wifi: WifiMonitor,
    version: VersionMonitor,
    internet: InternetMonitor,
    versions: VersionStore,
    audit: AuditLog,
}

impl WatchdogEngine {
    pub fn new(
        config: &WatchdogConfig,
        env: &SupervisorEnv,
        client: SupervisorClient,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            client,
            app_name: env.app_name.clone(),
            wifi_service: config.wifi.service.clone(),
            hass_service: config.version.service.clone(),
            internet_host: config.internet.host.clone(),
            pinger: Pinger::new(
                config.internet.ping_command.clone(),
                config.internet.ping_timeout(),
            ),
            wifi: WifiMonitor::new(secs(config.wifi.max_runtime_secs)),
            version: VersionMonitor::new(secs(config.version.debounce_secs)),
            internet: InternetMonitor::new(secs(config.internet.grace_secs), started_at),
            versions: VersionStore::new(&config.version.version_file),
            audit: AuditLog::new(&config.audit.log_file),
        }
    }

    pub fn wifi(&self) -> &WifiMonitor {
        &self.wifi
    }

    pub fn version(&self) -> &VersionMonitor {
        &self.version
    }

    pub fn internet(&self) -> &InternetMonitor {
        &self.internet
    }

    /// Run one cycle at the current wall-clock time.
    pub async fn tick(&mut self) {
        self.tick_at(Utc::now()).await;
    }

    /// Run one cycle as if the time were `now`.
    pub async fn tick_at(&mut self, now: DateTime<Utc>) {
        self.check_wifi_repeater(now).await;
        self.check_release(now).await;
        self.check_internet(now).await;
    }

    /// Tick every `interval` until Ctrl-C.
    pub async fn run(&mut self, interval: Duration) {
        info!(interval_secs = interval.as_secs(), "watchdog started");
        loop {
            self.tick().await;
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupt received, watchdog stopping");
                    return;
                }
            }
        }
    }

    async fn check_wifi_repeater(&mut self, now: DateTime<Utc>) {
        let raw = match self.client.get_status().await {
            Ok(raw) => raw,
            Err(e) => {
                error!(error = %e, "skipping wifi-repeater check");
                return;
            }
        };
        let status = match DeviceStatus::from_json(&raw) {
            Ok(status) => status,
            Err(e) => {
                warn!(error = %e, "unexpected device status, skipping wifi-repeater check");
                return;
            }
        };

        let running = status.is_running(&self.wifi_service);
        if let WifiDecision::Stop { elapsed } = self.wifi.observe(running, now) {
            match self.client.stop_service(&self.wifi_service).await {
                Ok(()) => info!(
                    service = %self.wifi_service,
                    elapsed_secs = elapsed.num_seconds(),
                    "stopped service"
                ),
                Err(e) => error!(service = %self.wifi_service, error = %e, "failed to stop service"),
            }
        }
    }

    async fn check_release(&mut self, now: DateTime<Utc>) {
        let fetched = match self.client.get_application_state().await {
            Ok(state) => {
                let id = release_id(&state, &self.app_name, &self.hass_service);
                if id.is_none() {
                    warn!(
                        app = %self.app_name,
                        service = %self.hass_service,
                        "release id not found in application state"
                    );
                }
                id
            }
            Err(e) => {
                error!(error = %e, "skipping release check");
                return;
            }
        };

        let persisted = match self.versions.load() {
            Ok(v) => v,
            Err(e) => {
                error!(error = %e, "skipping release check");
                return;
            }
        };

        let VersionDecision::Restart { from, to } =
            self.version.observe(fetched.as_deref(), &persisted, now)
        else {
            return;
        };

        if let Err(e) = self.client.restart_service(&self.hass_service).await {
            error!(
                service = %self.hass_service,
                error = %e,
                "restart failed, will retry next cycle"
            );
            return;
        }
        if let Err(e) = self.versions.save(&to) {
            // Unpersisted: debounce again before the next restart.
            error!(error = %e, "failed to persist release id");
            self.version.reset();
        }
        let message = format!(
            "version updated from {from} to {to}. Restarting {}.",
            self.hass_service
        );
        if let Err(e) = self.audit.record(&message) {
            error!(error = %e, "failed to write audit log");
        }
    }

    async fn check_internet(&mut self, now: DateTime<Utc>) {
        let reachable = match self.pinger.probe(&self.internet_host).await {
            Ok(reachable) => reachable,
            Err(e) => {
                error!(host = %self.internet_host, error = %e, "skipping internet check");
                return;
            }
        };

        if let InternetDecision::Reboot { elapsed } = self.internet.observe(reachable, now) {
            let message = format!(
                "Unable to connect to the internet for {} minutes. Restarting",
                elapsed.num_minutes()
            );
            if let Err(e) = self.audit.record(&message) {
                error!(error = %e, "failed to write audit log");
            }
            if let Err(e) = self.client.reboot_host().await {
                error!(error = %e, "reboot request failed");
            }
        }
    }
}
