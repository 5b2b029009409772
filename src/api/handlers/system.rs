use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::api::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
    services: ServiceHealth,
}

#[derive(Serialize)]
pub struct ServiceHealth {
    api: &'static str,
    store: &'static str,
    queue: &'static str,
}

fn up_or_down(healthy: bool) -> &'static str {
    if healthy {
        "up"
    } else {
        "down"
    }
}

/// GET /health - 存活與協作方健康檢查
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.orchestrator.check_health().await;
    let all_up = snapshot.store && snapshot.queue;

    let health_response = HealthResponse {
        status: if all_up { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        services: ServiceHealth {
            api: "up",
            store: up_or_down(snapshot.store),
            queue: up_or_down(snapshot.queue),
        },
    };

    Json(health_response)
}

#[derive(Serialize)]
pub struct RootResponse {
    message: String,
    health_url: &'static str,
}

/// GET / - 服務資訊
pub async fn root() -> impl IntoResponse {
    Json(RootResponse {
        message: "fininsight-server is running".to_string(),
        health_url: "/health",
    })
}
