use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::time::Instant;

use crate::{session::SessionKey, AppState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthChecks {
    pub database: ComponentHealth,
    pub sessions: ComponentHealth,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub version: &'static str,
    pub timestamp: String,
    pub uptime_secs: u64,
    pub checks: HealthChecks,
}

static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Call once at startup so uptime is measured from boot
pub fn init_start_time() {
    let _ = START_TIME.get_or_init(Instant::now);
}

fn uptime_secs() -> u64 {
    START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0)
}

fn component<E: std::fmt::Display>(started: Instant, result: Result<(), E>) -> ComponentHealth {
    let latency_ms = started.elapsed().as_millis() as u64;
    match result {
        Ok(()) => ComponentHealth {
            status: ComponentStatus::Up,
            latency_ms,
            error: None,
        },
        Err(e) => ComponentHealth {
            status: ComponentStatus::Down,
            latency_ms,
            error: Some(e.to_string()),
        },
    }
}

/// Liveness probe
pub async fn liveness() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "up",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness probe: the database answers and the session backend can be read
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let started = Instant::now();
    let database = component(started, crate::db::check_connection(&state.db).await);

    let started = Instant::now();
    let probe = SessionKey::generate();
    let sessions = component(started, state.sessions.load(&probe).await.map(|_| ()));

    let status = if database.status == ComponentStatus::Up && sessions.status == ComponentStatus::Up
    {
        ComponentStatus::Up
    } else {
        ComponentStatus::Down
    };
    let code = match status {
        ComponentStatus::Up => StatusCode::OK,
        ComponentStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_secs: uptime_secs(),
            checks: HealthChecks { database, sessions },
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_component_reports_error() {
        let health = component(Instant::now(), Err::<(), _>("connection refused"));
        assert_eq!(health.status, ComponentStatus::Down);
        assert_eq!(health.error.as_deref(), Some("connection refused"));

        let health = component(Instant::now(), Ok::<(), String>(()));
        assert_eq!(health.status, ComponentStatus::Up);
        assert!(health.error.is_none());
    }
}
