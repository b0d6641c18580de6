use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::{Value, json};

use crate::api::error::{ApiError, ErrorContext};
use crate::infrastructure::AppState;
use crate::infrastructure::auth::AdminSession;
use crate::models::content::ContentType;
use crate::services::content_service;

pub(crate) fn parse_content_type(raw: &str) -> Result<ContentType, ApiError> {
    raw.parse::<ContentType>()
        .map_err(|e| ApiError::bad_request(e.to_string()))
}

/// GET /api/admin/content/:content_type
#[utoipa::path(
    get,
    path = "/api/admin/content/{content_type}",
    params(("content_type" = String, Path, description = "blog_post, project, site_content or form")),
    responses(
        (status = 200, description = "All items of this type"),
        (status = 400, description = "Unknown content type"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn list_content(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(content_type): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let content_type = parse_content_type(&content_type)?;
    let items = content_service::list_content(state.db(), content_type)
        .await
        .context("list_content", content_type.as_str())?;

    Ok(Json(json!({
        "success": true,
        "count": items.len(),
        "items": items
    })))
}

/// GET /api/admin/content/:content_type/:id
#[utoipa::path(
    get,
    path = "/api/admin/content/{content_type}/{id}",
    params(
        ("content_type" = String, Path, description = "Content type"),
        ("id" = i32, Path, description = "Content id")
    ),
    responses(
        (status = 200, description = "The item"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_content(
    State(state): State<AppState>,
    _session: AdminSession,
    Path((content_type, id)): Path<(String, i32)>,
) -> Result<Json<Value>, ApiError> {
    let content_type = parse_content_type(&content_type)?;
    let item = content_service::get_content(state.db(), content_type, id)
        .await
        .context("get_content", format!("{} #{}", content_type.as_str(), id))?;
    Ok(Json(json!({ "success": true, "item": item })))
}

/// POST /api/admin/content/:content_type - create an item (version 1)
#[utoipa::path(
    post,
    path = "/api/admin/content/{content_type}",
    params(("content_type" = String, Path, description = "Content type")),
    responses(
        (status = 201, description = "Created"),
        (status = 400, description = "Invalid content"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn create_content(
    State(state): State<AppState>,
    session: AdminSession,
    Path(content_type): Path<String>,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let content_type = parse_content_type(&content_type)?;
    let item = content_service::create_content(state.db(), content_type, payload, &session.user)
        .await
        .context("create_content", content_type.as_str())?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "item": item })),
    ))
}

/// PUT /api/admin/content/:content_type/:id - partial update
#[utoipa::path(
    put,
    path = "/api/admin/content/{content_type}/{id}",
    params(
        ("content_type" = String, Path, description = "Content type"),
        ("id" = i32, Path, description = "Content id")
    ),
    responses(
        (status = 200, description = "Updated"),
        (status = 400, description = "Invalid content"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_content(
    State(state): State<AppState>,
    session: AdminSession,
    Path((content_type, id)): Path<(String, i32)>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let content_type = parse_content_type(&content_type)?;
    let item =
        content_service::update_content(state.db(), content_type, id, payload, &session.user)
            .await
            .context("update_content", format!("{} #{}", content_type.as_str(), id))?;

    Ok(Json(json!({ "success": true, "item": item })))
}

/// DELETE /api/admin/content/:content_type/:id
#[utoipa::path(
    delete,
    path = "/api/admin/content/{content_type}/{id}",
    params(
        ("content_type" = String, Path, description = "Content type"),
        ("id" = i32, Path, description = "Content id")
    ),
    responses(
        (status = 200, description = "Deleted; the last state is kept as a version"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_content(
    State(state): State<AppState>,
    session: AdminSession,
    Path((content_type, id)): Path<(String, i32)>,
) -> Result<Json<Value>, ApiError> {
    let content_type = parse_content_type(&content_type)?;
    let item = content_service::delete_content(state.db(), content_type, id, &session.user)
        .await
        .context("delete_content", format!("{} #{}", content_type.as_str(), id))?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Deleted {} #{}", content_type.label(), id),
        "version_number": item.version_number
    })))
}
