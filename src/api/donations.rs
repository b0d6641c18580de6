use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::error::{ApiError, ErrorContext};
use crate::infrastructure::AppState;
use crate::infrastructure::auth::AdminSession;
use crate::models::donation::Environment;
use crate::services::donation_service::{self, CheckoutRequest, DonationFilter};
use crate::services::payment_service::{self, RefreshSource, StatusOutcome};

#[derive(Deserialize)]
pub struct RefreshStatusRequest {
    pub reference: Option<String>,
}

#[derive(Deserialize)]
pub struct MarkExpiredRequest {
    pub reference: Option<String>,
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct StatsQuery {
    pub environment: Option<Environment>,
}

fn required_reference(reference: Option<String>) -> Result<String, ApiError> {
    reference
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .ok_or_else(|| ApiError::bad_request("reference is required"))
}

/// POST /api/donations/checkout - start a donation and get the payment URL
#[utoipa::path(
    post,
    path = "/api/donations/checkout",
    responses(
        (status = 201, description = "Bill created"),
        (status = 400, description = "Invalid donation"),
        (status = 500, description = "Payment gateway unavailable")
    )
)]
pub async fn checkout(
    State(state): State<AppState>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let target = format!("{} sen from {}", payload.amount, payload.donor_email.trim());
    let created = donation_service::checkout(
        state.db(),
        state.gateway(),
        &state.config.public_base_url,
        payload,
    )
    .await
    .context("checkout", &target)?;

    let mut body = serde_json::to_value(&created).context("checkout", &created.reference)?;
    body["success"] = json!(true);

    Ok((StatusCode::CREATED, Json(body)))
}

/// GET /api/donations/:reference/status - donor-facing status
#[utoipa::path(
    get,
    path = "/api/donations/{reference}/status",
    params(("reference" = String, Path, description = "Payment reference")),
    responses(
        (status = 200, description = "Current donation status"),
        (status = 404, description = "Donation not found")
    )
)]
pub async fn public_status(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let status = donation_service::public_status(state.db(), &reference)
        .await
        .context("public_status", &reference)?;
    Ok(Json(json!({ "success": true, "donation": status })))
}

/// POST /api/admin/donations/refresh-status - reconcile one donation with the gateway
#[utoipa::path(
    post,
    path = "/api/admin/donations/refresh-status",
    responses(
        (status = 200, description = "Reconciliation outcome"),
        (status = 400, description = "Missing reference or bill code"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Donation not found"),
        (status = 500, description = "Gateway not configured or unreachable")
    )
)]
pub async fn refresh_status(
    State(state): State<AppState>,
    session: AdminSession,
    Json(payload): Json<RefreshStatusRequest>,
) -> Result<Json<StatusOutcome>, ApiError> {
    let reference = required_reference(payload.reference)?;
    tracing::debug!("{} refreshing donation {}", session.user, reference);

    let outcome = payment_service::refresh_status(
        state.db(),
        state.gateway(),
        state.receipts.as_ref(),
        &reference,
        RefreshSource::Admin,
    )
    .await
    .context("refresh_status", &reference)?;

    Ok(Json(outcome))
}

/// POST /api/admin/donations/mark-expired
#[utoipa::path(
    post,
    path = "/api/admin/donations/mark-expired",
    responses(
        (status = 200, description = "Donation expired, or already expired"),
        (status = 400, description = "Missing reference, or donation already completed"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Donation not found"),
        (status = 409, description = "Status changed concurrently")
    )
)]
pub async fn mark_expired(
    State(state): State<AppState>,
    session: AdminSession,
    Json(payload): Json<MarkExpiredRequest>,
) -> Result<Json<StatusOutcome>, ApiError> {
    let reference = required_reference(payload.reference)?;

    let outcome = payment_service::mark_expired(
        state.db(),
        &reference,
        payload.reason.as_deref(),
        &session.user,
    )
    .await
    .context("mark_expired", &reference)?;

    Ok(Json(outcome))
}

/// GET /api/admin/donations
#[utoipa::path(
    get,
    path = "/api/admin/donations",
    responses(
        (status = 200, description = "Page of donations, newest first"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn list_donations(
    State(state): State<AppState>,
    _session: AdminSession,
    Query(filter): Query<DonationFilter>,
) -> Result<Json<Value>, ApiError> {
    let target = format!("page {}", filter.page.unwrap_or(1));
    let page = donation_service::list_donations(state.db(), filter)
        .await
        .context("list_donations", &target)?;
    Ok(Json(json!({
        "success": true,
        "donations": page.donations,
        "total": page.total,
        "page": page.page,
        "limit": page.limit
    })))
}

/// GET /api/admin/donations/:reference/logs
#[utoipa::path(
    get,
    path = "/api/admin/donations/{reference}/logs",
    params(("reference" = String, Path, description = "Payment reference")),
    responses(
        (status = 200, description = "Audit trail, oldest first"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Donation not found")
    )
)]
pub async fn donation_logs(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(reference): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let logs = donation_service::donation_logs(state.db(), &reference)
        .await
        .context("donation_logs", &reference)?;

    let logs: Vec<Value> = logs
        .into_iter()
        .map(|log| {
            json!({
                "id": log.id,
                "eventType": log.event_type,
                "eventData": log
                    .event_data
                    .as_deref()
                    .and_then(|d| serde_json::from_str::<Value>(d).ok()),
                "createdAt": log.created_at,
            })
        })
        .collect();

    Ok(Json(json!({ "success": true, "logs": logs })))
}

/// DELETE /api/admin/donations/sandbox - remove test donations
#[utoipa::path(
    delete,
    path = "/api/admin/donations/sandbox",
    responses(
        (status = 200, description = "Number of sandbox donations removed"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn purge_sandbox(
    State(state): State<AppState>,
    session: AdminSession,
) -> Result<Json<Value>, ApiError> {
    let removed = donation_service::purge_sandbox(state.db())
        .await
        .context("purge_sandbox", "sandbox donations")?;
    tracing::info!("{} purged {} sandbox donations", session.user, removed);
    Ok(Json(json!({ "success": true, "removed": removed })))
}

/// GET /api/admin/stats/donations
#[utoipa::path(
    get,
    path = "/api/admin/stats/donations",
    responses(
        (status = 200, description = "Counts per status and completed total"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn donation_stats(
    State(state): State<AppState>,
    _session: AdminSession,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Value>, ApiError> {
    let target = query.environment.map_or("all", |e| e.as_str());
    let stats = donation_service::donation_stats(state.db(), query.environment)
        .await
        .context("donation_stats", target)?;
    Ok(Json(json!({ "success": true, "stats": stats })))
}
