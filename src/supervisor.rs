/// Client for the device supervisor's local HTTP API.
///
/// Every request carries the API key as an `apikey` query parameter. Any
/// network failure or non-2xx status is returned as a `SupervisorError`; the
/// caller logs it and skips the action for this cycle.
use crate::config::SupervisorEnv;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Errors from a single supervisor API call.
#[derive(Debug)]
pub enum SupervisorError {
    /// The request never produced a response (connect, timeout, TLS).
    Request {
        op: &'static str,
        source: reqwest::Error,
    },
    /// The supervisor answered with a non-2xx status.
    Status { op: &'static str, status: StatusCode },
    /// The response body was not the JSON we expected.
    Decode {
        op: &'static str,
        source: reqwest::Error,
    },
}

impl std::fmt::Display for SupervisorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SupervisorError::Request { op, source } => {
                write!(f, "{} request failed: {}", op, source)
            }
            SupervisorError::Status { op, status } => {
                write!(f, "{} returned HTTP {}", op, status)
            }
            SupervisorError::Decode { op, source } => {
                write!(f, "{} returned an unexpected body: {}", op, source)
            }
        }
    }
}

impl std::error::Error for SupervisorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SupervisorError::Request { source, .. } => Some(source),
            SupervisorError::Status { .. } => None,
            SupervisorError::Decode { source, .. } => Some(source),
        }
    }
}

/// Run state of a container as reported by `/v2/state/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum RunState {
    Running,
    Stopped,
    #[serde(other)]
    Other,
}

/// One entry of the `containers` array.
#[derive(Debug, Clone, Deserialize)]
pub struct ContainerStatus {
    #[serde(rename = "serviceName")]
    pub service_name: String,
    pub status: RunState,
}

/// The subset of `/v2/state/status` the watchdog reads.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceStatus {
    pub containers: Vec<ContainerStatus>,
}

impl DeviceStatus {
    /// Parse a raw status response.
    pub fn from_json(value: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    /// Whether `service` is listed and Running. A service missing from the
    /// list is reported as not running.
    pub fn is_running(&self, service: &str) -> bool {
        let mut running = false;
        for container in &self.containers {
            if container.service_name == service {
                running = container.status == RunState::Running;
            }
        }
        running
    }
}

/// Extract `<app_name>.services.<service>.releaseId` from an application
/// state response. Strings and numbers are accepted; anything else is unknown.
pub fn release_id(state: &Value, app_name: &str, service: &str) -> Option<String> {
    match state.get(app_name)?.get("services")?.get(service)?.get("releaseId")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Thin wrapper around the five supervisor endpoints the watchdog uses.
#[derive(Debug, Clone)]
pub struct SupervisorClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    app_id: String,
}

impl SupervisorClient {
    /// Build a client for the supervisor described by `env`.
    pub fn new(env: &SupervisorEnv, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: env.address.trim_end_matches('/').to_string(),
            api_key: env.api_key.clone(),
            app_id: env.app_id.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET `/v2/state/status`.
    pub async fn get_status(&self) -> Result<Value, SupervisorError> {
        self.get_json("get status", "/v2/state/status").await
    }

    /// GET `/v2/applications/state`.
    pub async fn get_application_state(&self) -> Result<Value, SupervisorError> {
        self.get_json("get application state", "/v2/applications/state")
            .await
    }

    /// POST `/v2/applications/{appId}/stop-service`.
    pub async fn stop_service(&self, name: &str) -> Result<(), SupervisorError> {
        let path = format!("/v2/applications/{}/stop-service", self.app_id);
        self.post("stop service", &path, Some(name)).await
    }

    /// POST `/v2/applications/{appId}/restart-service`.
    pub async fn restart_service(&self, name: &str) -> Result<(), SupervisorError> {
        let path = format!("/v2/applications/{}/restart-service", self.app_id);
        self.post("restart service", &path, Some(name)).await
    }

    /// POST `/v1/reboot`.
    pub async fn reboot_host(&self) -> Result<(), SupervisorError> {
        self.post("reboot host", "/v1/reboot", None).await
    }

    async fn get_json(&self, op: &'static str, path: &str) -> Result<Value, SupervisorError> {
        let resp = self
            .http
            .get(self.url(path))
            .query(&[("apikey", &self.api_key)])
            .send()
            .await
            .map_err(|e| SupervisorError::Request { op, source: e })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SupervisorError::Status { op, status });
        }

        resp.json::<Value>()
            .await
            .map_err(|e| SupervisorError::Decode { op, source: e })
    }

    async fn post(
        &self,
        op: &'static str,
        path: &str,
        service_name: Option<&str>,
    ) -> Result<(), SupervisorError> {
        let mut req = self
            .http
            .post(self.url(path))
            .query(&[("apikey", &self.api_key)]);
        req = match service_name {
            Some(name) => req.json(&serde_json::json!({ "serviceName": name })),
            None => req.json(&serde_json::json!({})),
        };

        let resp = req
            .send()
            .await
            .map_err(|e| SupervisorError::Request { op, source: e })?;

        let status = resp.status();
        tracing::debug!(op, status = %status, "supervisor responded");
        if !status.is_success() {
            return Err(SupervisorError::Status { op, status });
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! In-process stand-in for the supervisor API, shared with engine tests.
    use axum::{
        extract::{Path, Query, State},
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    pub const API_KEY: &str = "test-key";
    pub const APP_ID: &str = "42";
    pub const APP_NAME: &str = "hass-box";

    /// Recorded calls and canned responses.
    #[derive(Default)]
    pub struct MockState {
        pub status: Option<Value>,
        pub application_state: Option<Value>,
        pub fail_posts: bool,
        /// (endpoint, serviceName) per POST received.
        pub posts: Vec<(String, Option<String>)>,
    }

    pub type Shared = Arc<Mutex<MockState>>;

    fn authorized(query: &HashMap<String, String>) -> bool {
        query.get("apikey").map(String::as_str) == Some(API_KEY)
    }

    async fn status(
        State(state): State<Shared>,
        Query(query): Query<HashMap<String, String>>,
    ) -> Result<Json<Value>, StatusCode> {
        if !authorized(&query) {
            return Err(StatusCode::UNAUTHORIZED);
        }
        let st = state.lock().unwrap();
        st.status.clone().map(Json).ok_or(StatusCode::SERVICE_UNAVAILABLE)
    }

    async fn application_state(
        State(state): State<Shared>,
        Query(query): Query<HashMap<String, String>>,
    ) -> Result<Json<Value>, StatusCode> {
        if !authorized(&query) {
            return Err(StatusCode::UNAUTHORIZED);
        }
        let st = state.lock().unwrap();
        st.application_state
            .clone()
            .map(Json)
            .ok_or(StatusCode::SERVICE_UNAVAILABLE)
    }

    fn record(state: &Shared, endpoint: String, body: &Value) -> StatusCode {
        let mut st = state.lock().unwrap();
        let service = body
            .get("serviceName")
            .and_then(Value::as_str)
            .map(str::to_string);
        st.posts.push((endpoint, service));
        if st.fail_posts {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::OK
        }
    }

    async fn app_action(
        State(state): State<Shared>,
        Path((app_id, action)): Path<(String, String)>,
        Query(query): Query<HashMap<String, String>>,
        Json(body): Json<Value>,
    ) -> StatusCode {
        if !authorized(&query) || app_id != APP_ID {
            return StatusCode::UNAUTHORIZED;
        }
        record(&state, action, &body)
    }

    async fn reboot(
        State(state): State<Shared>,
        Query(query): Query<HashMap<String, String>>,
        Json(body): Json<Value>,
    ) -> StatusCode {
        if !authorized(&query) {
            return StatusCode::UNAUTHORIZED;
        }
        record(&state, "reboot".to_string(), &body)
    }

    /// Serve the mock on an ephemeral port; returns its base URL.
    pub async fn spawn(state: Shared) -> String {
        let app = Router::new()
            .route("/v2/state/status", get(status))
            .route("/v2/applications/state", get(application_state))
            .route("/v2/applications/{app_id}/{action}", post(app_action))
            .route("/v1/reboot", post(reboot))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }
}
