use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::content::parse_content_type;
use crate::api::error::{ApiError, ErrorContext};
use crate::infrastructure::AppState;
use crate::infrastructure::auth::AdminSession;
use crate::models::content_version::VersionDto;
use crate::services::version_service::{self, ActivityFilter};

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u64>,
}

#[derive(Deserialize)]
pub struct ActivityQuery {
    pub content_type: Option<String>,
    pub content_id: Option<i32>,
    pub actor: Option<String>,
    pub action: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// GET /api/admin/content/:content_type/:id/versions - newest first
#[utoipa::path(
    get,
    path = "/api/admin/content/{content_type}/{id}/versions",
    params(
        ("content_type" = String, Path, description = "blog_post, project, site_content or form"),
        ("id" = i32, Path, description = "Content id")
    ),
    responses(
        (status = 200, description = "Version history"),
        (status = 400, description = "Unknown content type"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn version_history(
    State(state): State<AppState>,
    _session: AdminSession,
    Path((content_type, id)): Path<(String, i32)>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>, ApiError> {
    let content_type = parse_content_type(&content_type)?;

    let versions: Vec<VersionDto> =
        version_service::get_version_history(state.db(), content_type, id, query.limit)
            .await
            .context("version_history", format!("{} #{}", content_type.as_str(), id))?
            .into_iter()
            .map(VersionDto::from)
            .collect();

    Ok(Json(json!({
        "success": true,
        "content_type": content_type,
        "content_id": id,
        "versions": versions
    })))
}

/// GET /api/admin/versions/:id
#[utoipa::path(
    get,
    path = "/api/admin/versions/{id}",
    params(("id" = i32, Path, description = "Version id")),
    responses(
        (status = 200, description = "Version snapshot"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Version not found")
    )
)]
pub async fn get_version(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let version = version_service::get_version(state.db(), id)
        .await
        .context("get_version", format!("version {}", id))?;
    Ok(Json(json!({ "success": true, "version": VersionDto::from(version) })))
}

/// POST /api/admin/versions/:id/restore - make a snapshot live again
#[utoipa::path(
    post,
    path = "/api/admin/versions/{id}/restore",
    params(("id" = i32, Path, description = "Version id")),
    responses(
        (status = 200, description = "Restored; a new version was recorded"),
        (status = 400, description = "Unsupported content type"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Version not found")
    )
)]
pub async fn restore_version(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let restored = version_service::restore_version(state.db(), id, Some(&session.user))
        .await
        .context("restore_version", format!("version {}", id))?;

    Ok(Json(json!({
        "success": true,
        "message": format!(
            "Restored {} \"{}\" to version {}",
            restored.content_type.label(),
            restored.title,
            restored.restored_from_version
        ),
        "restored": restored
    })))
}

/// GET /api/admin/activity
#[utoipa::path(
    get,
    path = "/api/admin/activity",
    responses(
        (status = 200, description = "Activity log, newest first"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn activity_log(
    State(state): State<AppState>,
    _session: AdminSession,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Value>, ApiError> {
    let page = version_service::get_activity_log(
        state.db(),
        ActivityFilter {
            content_type: query.content_type,
            content_id: query.content_id,
            actor: query.actor,
            action: query.action,
            limit: query.limit,
            offset: query.offset,
        },
    )
    .await
    .context("activity_log", "entries")?;

    let entries: Vec<Value> = page
        .entries
        .into_iter()
        .map(|entry| {
            let metadata = entry
                .metadata
                .as_deref()
                .and_then(|m| serde_json::from_str::<Value>(m).ok());
            json!({
                "id": entry.id,
                "action": entry.action,
                "description": entry.description,
                "content_type": entry.content_type,
                "content_id": entry.content_id,
                "content_title": entry.content_title,
                "actor": entry.actor,
                "metadata": metadata,
                "created_at": entry.created_at,
            })
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "entries": entries,
        "total": page.total
    })))
}

/// GET /api/admin/stats/versions
#[utoipa::path(
    get,
    path = "/api/admin/stats/versions",
    responses(
        (status = 200, description = "Versioning statistics"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn version_stats(
    State(state): State<AppState>,
    _session: AdminSession,
) -> Result<Json<Value>, ApiError> {
    let stats = version_service::get_version_stats(state.db())
        .await
        .context("version_stats", "all content")?;
    Ok(Json(json!({ "success": true, "stats": stats })))
}
