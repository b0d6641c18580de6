//! Content Service - the one write path for versioned content
//!
//! Create, update and delete for every `ContentType` go through here. Each
//! mutation and its version row are written in the same transaction, so a
//! content change without a version cannot be committed.

use chrono::Utc;
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Serialize;
use serde_json::Value;

use crate::domain::DomainError;
use crate::models::content::{ChangeType, ContentType, VersionedContent};
use crate::models::{blog_post, form, project, site_content};
use crate::services::version_service::{self, VersionOptions};

/// A content row as returned to the dashboard
#[derive(Debug, Clone, Serialize)]
pub struct ContentRecord {
    pub content_type: ContentType,
    pub id: i32,
    pub title: String,
    pub version_number: Option<i32>,
    pub data: Value,
}

fn record<M: VersionedContent>(
    model: &M,
    version_number: Option<i32>,
) -> Result<ContentRecord, DomainError> {
    Ok(ContentRecord {
        content_type: M::CONTENT_TYPE,
        id: model.id(),
        title: model.title(),
        version_number,
        data: serde_json::to_value(model)?,
    })
}

/// Overlay the keys of `patch` onto `base` (shallow merge)
pub fn merge_fields(mut base: Value, patch: Value) -> Value {
    if let (Value::Object(base_map), Value::Object(patch_map)) = (&mut base, patch) {
        for (key, value) in patch_map {
            base_map.insert(key, value);
        }
    }
    base
}

fn parse_fields<M: VersionedContent>(payload: Value) -> Result<M::Fields, DomainError> {
    let fields: M::Fields = serde_json::from_value(payload)
        .map_err(|e| DomainError::Validation(format!("invalid {}: {}", M::CONTENT_TYPE.label(), e)))?;
    M::validate(&fields).map_err(DomainError::Validation)?;
    Ok(fields)
}

pub async fn list_content(
    db: &DatabaseConnection,
    content_type: ContentType,
) -> Result<Vec<ContentRecord>, DomainError> {
    match content_type {
        ContentType::BlogPost => list_as::<blog_post::Model>(db).await,
        ContentType::Project => list_as::<project::Model>(db).await,
        ContentType::SiteContent => list_as::<site_content::Model>(db).await,
        ContentType::Form => list_as::<form::Model>(db).await,
    }
}

pub async fn get_content(
    db: &DatabaseConnection,
    content_type: ContentType,
    id: i32,
) -> Result<ContentRecord, DomainError> {
    match content_type {
        ContentType::BlogPost => get_as::<blog_post::Model>(db, id).await,
        ContentType::Project => get_as::<project::Model>(db, id).await,
        ContentType::SiteContent => get_as::<site_content::Model>(db, id).await,
        ContentType::Form => get_as::<form::Model>(db, id).await,
    }
}

pub async fn create_content(
    db: &DatabaseConnection,
    content_type: ContentType,
    payload: Value,
    actor: &str,
) -> Result<ContentRecord, DomainError> {
    match content_type {
        ContentType::BlogPost => create_as::<blog_post::Model>(db, payload, actor).await,
        ContentType::Project => create_as::<project::Model>(db, payload, actor).await,
        ContentType::SiteContent => create_as::<site_content::Model>(db, payload, actor).await,
        ContentType::Form => create_as::<form::Model>(db, payload, actor).await,
    }
}

/// Partial update: keys present in `payload` replace the current values
pub async fn update_content(
    db: &DatabaseConnection,
    content_type: ContentType,
    id: i32,
    payload: Value,
    actor: &str,
) -> Result<ContentRecord, DomainError> {
    match content_type {
        ContentType::BlogPost => update_as::<blog_post::Model>(db, id, payload, actor).await,
        ContentType::Project => update_as::<project::Model>(db, id, payload, actor).await,
        ContentType::SiteContent => update_as::<site_content::Model>(db, id, payload, actor).await,
        ContentType::Form => update_as::<form::Model>(db, id, payload, actor).await,
    }
}

pub async fn delete_content(
    db: &DatabaseConnection,
    content_type: ContentType,
    id: i32,
    actor: &str,
) -> Result<ContentRecord, DomainError> {
    match content_type {
        ContentType::BlogPost => delete_as::<blog_post::Model>(db, id, actor).await,
        ContentType::Project => delete_as::<project::Model>(db, id, actor).await,
        ContentType::SiteContent => delete_as::<site_content::Model>(db, id, actor).await,
        ContentType::Form => delete_as::<form::Model>(db, id, actor).await,
    }
}

async fn list_as<M: VersionedContent>(
    db: &DatabaseConnection,
) -> Result<Vec<ContentRecord>, DomainError> {
    M::list(db)
        .await?
        .iter()
        .map(|m| record(m, None))
        .collect()
}

async fn get_as<M: VersionedContent>(
    db: &DatabaseConnection,
    id: i32,
) -> Result<ContentRecord, DomainError> {
    let model = M::find(db, id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("{} {} not found", M::CONTENT_TYPE.label(), id)))?;
    record(&model, None)
}

async fn create_as<M: VersionedContent>(
    db: &DatabaseConnection,
    payload: Value,
    actor: &str,
) -> Result<ContentRecord, DomainError> {
    let fields = parse_fields::<M>(payload)?;
    let now = Utc::now().to_rfc3339();

    let txn = db.begin().await?;
    let model = M::insert(&txn, None, fields, &now).await?;
    let snapshot = serde_json::to_value(&model)?;

    let version = version_service::create_version(
        &txn,
        M::CONTENT_TYPE,
        model.id(),
        &snapshot,
        ChangeType::Create,
        Some(actor),
        VersionOptions {
            log_activity: true,
            title: Some(model.title()),
            ..Default::default()
        },
    )
    .await?;
    txn.commit().await?;

    tracing::info!("{} created {} #{}", actor, M::CONTENT_TYPE, model.id());
    record(&model, Some(version.version_number))
}

async fn update_as<M: VersionedContent>(
    db: &DatabaseConnection,
    id: i32,
    payload: Value,
    actor: &str,
) -> Result<ContentRecord, DomainError> {
    let now = Utc::now().to_rfc3339();
    let txn = db.begin().await?;

    let current = M::find(&txn, id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("{} {} not found", M::CONTENT_TYPE.label(), id)))?;
    let previous = serde_json::to_value(&current)?;
    let fields = parse_fields::<M>(merge_fields(previous.clone(), payload))?;

    let model = M::update(&txn, current, fields, &now).await?;
    let snapshot = serde_json::to_value(&model)?;

    let version = version_service::create_version(
        &txn,
        M::CONTENT_TYPE,
        id,
        &snapshot,
        ChangeType::Update,
        Some(actor),
        VersionOptions {
            log_activity: true,
            title: Some(model.title()),
            previous_data: Some(previous),
            ..Default::default()
        },
    )
    .await?;
    txn.commit().await?;

    tracing::info!("{} updated {} #{}", actor, M::CONTENT_TYPE, id);
    record(&model, Some(version.version_number))
}

async fn delete_as<M: VersionedContent>(
    db: &DatabaseConnection,
    id: i32,
    actor: &str,
) -> Result<ContentRecord, DomainError> {
    let txn = db.begin().await?;

    let current = M::find(&txn, id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("{} {} not found", M::CONTENT_TYPE.label(), id)))?;
    let snapshot = serde_json::to_value(&current)?;

    M::delete(&txn, id).await?;

    let version = version_service::create_version(
        &txn,
        M::CONTENT_TYPE,
        id,
        &snapshot,
        ChangeType::Delete,
        Some(actor),
        VersionOptions {
            log_activity: true,
            title: Some(current.title()),
            ..Default::default()
        },
    )
    .await?;
    txn.commit().await?;

    tracing::info!("{} deleted {} #{}", actor, M::CONTENT_TYPE, id);
    record(&current, Some(version.version_number))
}
