//! In-process mock of the UPS REST API
//!
//! Serves the mbdetnrs resource graph on an ephemeral localhost port and
//! records how often the token endpoint was hit.

#![allow(dead_code)]

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use eaton_ups_exporter::config::ExporterConfig;
use eaton_ups_exporter::ups::paths::{
    AUTH_PATH, MANAGER_PATH, POWER_DISTRIBUTION_PATH, TEMPERATURES_PATH,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const USER: &str = "admin";
pub const PASSWORD: &str = "secret";
pub const ACCESS_TOKEN: &str = "mock-token";

const TEMPERATURE_PATH: &str = "/rest/mbdetnrs/1.0/environmentService/temperatures/1";
const INPUTS_PATH: &str = "/rest/mbdetnrs/1.0/powerDistributions/1/inputs";
const OUTPUTS_PATH: &str = "/rest/mbdetnrs/1.0/powerDistributions/1/outputs";
const BACKUP_PATH: &str = "/rest/mbdetnrs/1.0/powerDistributions/1/backupSystem";
const POWER_BANK_PATH: &str = "/rest/mbdetnrs/1.0/powerDistributions/1/backupSystem/powerBank";

/// Behaviour switches of a mock device
#[derive(Debug, Clone, Default)]
pub struct MockOptions {
    /// Wrap port measures in the legacy `realtime` object
    pub legacy_measures: bool,
    /// Answer 401 even to requests carrying a valid token
    pub reject_all_tokens: bool,
    /// Token endpoint answers without a token pair
    pub reject_credentials: bool,
    /// Leave the `backupSystem` link out of the power distribution overview
    pub omit_backup_link: bool,
    /// Delay before the token endpoint answers
    pub login_delay: Option<Duration>,
    /// Delay before any GET answers
    pub get_delay: Option<Duration>,
    /// Power distribution id
    pub id: Option<Value>,
}

pub struct MockState {
    options: MockOptions,
    auth_calls: AtomicUsize,
    get_calls: AtomicUsize,
    expire_next: AtomicBool,
}

pub struct MockUps {
    pub address: String,
    state: Arc<MockState>,
}

impl MockUps {
    pub async fn start() -> Self {
        Self::start_with(MockOptions::default()).await
    }

    pub async fn start_with(options: MockOptions) -> Self {
        let state = Arc::new(MockState {
            options,
            auth_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
            expire_next: AtomicBool::new(false),
        });

        let app = Router::new().fallback(dispatch).with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock UPS");
        let addr = listener.local_addr().expect("Mock UPS has no address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            address: format!("http://{}", addr),
            state,
        }
    }

    pub fn auth_calls(&self) -> usize {
        self.state.auth_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.state.get_calls.load(Ordering::SeqCst)
    }

    /// Make the next authenticated GET report an expired session
    pub fn expire_session(&self) {
        self.state.expire_next.store(true, Ordering::SeqCst);
    }
}

/// Address of a port nothing listens on
pub async fn closed_address() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("No local address");
    drop(listener);
    format!("http://{}", addr)
}

pub fn test_config(threading: bool) -> ExporterConfig {
    ExporterConfig {
        insecure: false,
        threading,
        login_timeout_seconds: 1,
        request_timeout_seconds: 10,
    }
}

async fn dispatch(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let path = uri.path();

    if method == Method::POST && path == AUTH_PATH {
        return login(&state, &body).await;
    }
    if method != Method::GET {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    state.get_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(delay) = state.options.get_delay {
        tokio::time::sleep(delay).await;
    }

    let expected = format!("Bearer {}", ACCESS_TOKEN);
    let authorized = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if !authorized || state.options.reject_all_tokens {
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }
    if state.expire_next.swap(false, Ordering::SeqCst) {
        return Json(json!({"errorCode": 3, "errorMessage": "session expired"})).into_response();
    }

    match resource(&state.options, path) {
        Some(value) => Json(value).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn login(state: &MockState, body: &str) -> Response {
    state.auth_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(delay) = state.options.login_delay {
        tokio::time::sleep(delay).await;
    }

    let request: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let valid = request["username"] == USER
        && request["password"] == PASSWORD
        && request["grant_type"] == "password"
        && request["scope"] == "GUIAccess";
    if !valid || state.options.reject_credentials {
        return Json(json!({"error": "invalid_grant"})).into_response();
    }

    Json(json!({
        "token_type": "Bearer",
        "access_token": ACCESS_TOKEN,
        "expires_in": 900
    }))
    .into_response()
}

fn resource(options: &MockOptions, path: &str) -> Option<Value> {
    let value = match path {
        MANAGER_PATH => json!({
            "id": "1",
            "identification": {
                "name": "Eaton 5PX",
                "bootloaderVersion": "1.0.2",
                "firmwareVersion": "2.1.5",
                "vendor": "EATON"
            }
        }),
        TEMPERATURES_PATH => json!({
            "members@count": 1,
            "members": [{"@id": TEMPERATURE_PATH}]
        }),
        TEMPERATURE_PATH => json!({
            "name": "Internal",
            "position": "inlet",
            "measure": 300.0
        }),
        POWER_DISTRIBUTION_PATH => {
            let mut overview = json!({
                "id": options.id.clone().unwrap_or_else(|| json!("42")),
                "inputs": {"@id": INPUTS_PATH},
                "outputs": {"@id": OUTPUTS_PATH},
                "backupSystem": {"@id": BACKUP_PATH}
            });
            if options.omit_backup_link {
                if let Some(object) = overview.as_object_mut() {
                    object.remove("backupSystem");
                }
            }
            overview
        }
        p if p == format!("{}/1", INPUTS_PATH) => port(
            options,
            json!({"voltage": 230.5, "frequency": 50.0, "current": 1.2}),
            json!({"health": "ok"}),
        ),
        p if p == format!("{}/1", OUTPUTS_PATH) => port(
            options,
            json!({
                "voltage": 229.8,
                "frequency": 50.0,
                "current": 2.0,
                "apparentPower": 460.0,
                "activePower": 400.0,
                "powerFactor": 0.87,
                "percentLoad": "45",
                "averageEnergy": 12.0,
                "cumulatedEnergy": 3400.0,
                "efficiency": 96.0
            }),
            json!({"health": "ok"}),
        ),
        BACKUP_PATH => json!({"powerBank": {"@id": POWER_BANK_PATH}}),
        POWER_BANK_PATH => json!({
            "measures": {"voltage": 27.1, "stateOfCharge": 100.0, "remainingTime": 3540.0},
            "status": {"health": "ok"}
        }),
        _ => return None,
    };
    Some(value)
}

fn port(options: &MockOptions, measures: Value, status: Value) -> Value {
    let measures = if options.legacy_measures {
        json!({"realtime": measures})
    } else {
        measures
    };
    json!({
        "measures": measures,
        "status": status,
        "specifications": {
            "voltage": {"minReading": 184.0, "maxReading": 276.0, "nominal": 230.0}
        }
    })
}
