use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::infrastructure::AppState;

#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy")
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let gateway = match state.gateway() {
        Some(gw) if gw.is_sandbox() => "sandbox",
        Some(_) => "live",
        None => "not_configured",
    };

    Json(json!({
        "status": "ok",
        "service": "kasih",
        "version": env!("CARGO_PKG_VERSION"),
        "gateway": gateway
    }))
}
