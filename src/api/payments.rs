use axum::{
    Form, Json,
    extract::State,
};

use crate::api::error::{ApiError, ErrorContext};
use crate::infrastructure::AppState;
use crate::services::payment_service::{self, CallbackNotice, StatusOutcome};

/// POST /api/payments/callback - gateway server-to-server notification.
///
/// The notification only says "look again": the donation is reconciled
/// against the gateway, never against the posted status.
#[utoipa::path(
    post,
    path = "/api/payments/callback",
    responses(
        (status = 200, description = "Donation reconciled"),
        (status = 400, description = "Callback does not identify a donation"),
        (status = 404, description = "Donation not found")
    )
)]
pub async fn payment_callback(
    State(state): State<AppState>,
    Form(notice): Form<CallbackNotice>,
) -> Result<Json<StatusOutcome>, ApiError> {
    let target = notice
        .order_id
        .clone()
        .or_else(|| notice.billcode.clone())
        .unwrap_or_default();
    let outcome = payment_service::handle_callback(
        state.db(),
        state.gateway(),
        state.receipts.as_ref(),
        &notice,
    )
    .await
    .context("payment_callback", &target)?;

    Ok(Json(outcome))
}
