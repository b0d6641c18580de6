//! Version Service - write-once history of content mutations and restoration
//!
//! Every version row is a full snapshot of a record. Restoring copies a
//! snapshot back into the live table (re-creating the row if it was deleted)
//! and records the restoration as a new version.

use chrono::Utc;
use sea_orm::*;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;

use crate::domain::DomainError;
use crate::models::activity_log::{self, Entity as ActivityLog};
use crate::models::content::{ChangeType, ContentType, IDENTITY_FIELDS, VersionedContent};
use crate::models::content_version::{self, Entity as ContentVersion};
use crate::models::{blog_post, form, project, site_content};

pub const DEFAULT_HISTORY_LIMIT: u64 = 20;
pub const MAX_HISTORY_LIMIT: u64 = 100;
pub const DEFAULT_ACTIVITY_LIMIT: u64 = 50;
pub const MAX_ACTIVITY_LIMIT: u64 = 200;

/// Optional extras for `create_version`
#[derive(Debug, Default, Clone)]
pub struct VersionOptions {
    /// Write an activity log entry alongside the version
    pub log_activity: bool,
    /// Custom activity description; generated from change + content type otherwise
    pub description: Option<String>,
    /// Title recorded on the activity entry
    pub title: Option<String>,
    /// State of the record before this change
    pub previous_data: Option<Value>,
    pub restored_from_version: Option<i32>,
}

/// Input for an activity log entry
#[derive(Debug, Default, Clone)]
pub struct NewActivity {
    pub action: String,
    pub description: String,
    pub content_type: Option<String>,
    pub content_id: Option<i32>,
    pub content_title: Option<String>,
    pub actor: Option<String>,
    pub metadata: Option<Value>,
}

/// Filter parameters for the activity log
#[derive(Debug, Default, Clone)]
pub struct ActivityFilter {
    pub content_type: Option<String>,
    pub content_id: Option<i32>,
    pub actor: Option<String>,
    pub action: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ActivityPage {
    pub entries: Vec<activity_log::Model>,
    pub total: u64,
}

#[derive(Debug, Serialize)]
pub struct VersionStats {
    pub total_versions: u64,
    pub tracked_items: u64,
    pub versions_by_content_type: BTreeMap<String, i64>,
    pub versions_by_change_type: BTreeMap<String, i64>,
    pub activity_entries: u64,
    pub latest_version_at: Option<String>,
}

/// Outcome of a restoration
#[derive(Debug, Clone, Serialize)]
pub struct RestoredContent {
    pub content_type: ContentType,
    pub content_id: i32,
    pub title: String,
    pub restored_from_version: i32,
    pub new_version_number: i32,
    /// The live row had been deleted and was re-created
    pub recreated: bool,
    pub data: Value,
}

/// Append an entry to the activity log
pub async fn log_activity<C: ConnectionTrait>(
    db: &C,
    activity: NewActivity,
) -> Result<activity_log::Model, DomainError> {
    let entry = activity_log::ActiveModel {
        action: Set(activity.action),
        description: Set(activity.description),
        content_type: Set(activity.content_type),
        content_id: Set(activity.content_id),
        content_title: Set(activity.content_title),
        actor: Set(activity.actor),
        metadata: Set(activity.metadata.map(|m| m.to_string())),
        created_at: Set(Utc::now().to_rfc3339()),
        ..Default::default()
    };

    Ok(entry.insert(db).await?)
}

/// Record a snapshot of `content_id` as the next version of that item.
///
/// The version number is `1 + max(existing)`; the unique index on
/// (content_type, content_id, version_number) rejects a concurrent duplicate.
pub async fn create_version<C: ConnectionTrait>(
    db: &C,
    content_type: ContentType,
    content_id: i32,
    snapshot: &Value,
    change_type: ChangeType,
    author: Option<&str>,
    options: VersionOptions,
) -> Result<content_version::Model, DomainError> {
    let latest = ContentVersion::find()
        .filter(content_version::Column::ContentType.eq(content_type.as_str()))
        .filter(content_version::Column::ContentId.eq(content_id))
        .order_by_desc(content_version::Column::VersionNumber)
        .one(db)
        .await?;
    let version_number = latest.map(|v| v.version_number + 1).unwrap_or(1);

    let version = content_version::ActiveModel {
        content_type: Set(content_type.as_str().to_string()),
        content_id: Set(content_id),
        version_number: Set(version_number),
        data: Set(snapshot.to_string()),
        previous_data: Set(options.previous_data.as_ref().map(|p| p.to_string())),
        restored_from_version: Set(options.restored_from_version),
        change_type: Set(change_type),
        created_by: Set(author.map(str::to_string)),
        created_at: Set(Utc::now().to_rfc3339()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::debug!(
        "Recorded {} v{} for {} #{}",
        change_type.as_str(),
        version_number,
        content_type,
        content_id
    );

    if options.log_activity {
        let description = options.description.unwrap_or_else(|| match &options.title {
            Some(title) => format!("{} {} \"{}\"", change_type.verb(), content_type.label(), title),
            None => format!("{} {} #{}", change_type.verb(), content_type.label(), content_id),
        });

        log_activity(
            db,
            NewActivity {
                action: format!("{}_{}", content_type.as_str(), change_type.as_str()),
                description,
                content_type: Some(content_type.as_str().to_string()),
                content_id: Some(content_id),
                content_title: options.title,
                actor: author.map(str::to_string),
                metadata: Some(json!({
                    "version_id": version.id,
                    "version_number": version_number,
                    "restored_from_version": options.restored_from_version,
                })),
            },
        )
        .await?;
    }

    Ok(version)
}

/// Versions of one item, newest first
pub async fn get_version_history(
    db: &DatabaseConnection,
    content_type: ContentType,
    content_id: i32,
    limit: Option<u64>,
) -> Result<Vec<content_version::Model>, DomainError> {
    let limit = limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    Ok(ContentVersion::find()
        .filter(content_version::Column::ContentType.eq(content_type.as_str()))
        .filter(content_version::Column::ContentId.eq(content_id))
        .order_by_desc(content_version::Column::VersionNumber)
        .limit(limit)
        .all(db)
        .await?)
}

pub async fn get_version(
    db: &DatabaseConnection,
    id: i32,
) -> Result<content_version::Model, DomainError> {
    ContentVersion::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Version"))
}

/// Remove identity and timestamp keys so only content-bearing fields remain
pub fn strip_identity(mut snapshot: Value) -> Value {
    if let Value::Object(map) = &mut snapshot {
        for key in IDENTITY_FIELDS {
            map.remove(key);
        }
    }
    snapshot
}

/// Copy a historical snapshot back into the live table
pub async fn restore_version(
    db: &DatabaseConnection,
    version_id: i32,
    actor: Option<&str>,
) -> Result<RestoredContent, DomainError> {
    let version = get_version(db, version_id).await?;

    let content_type: ContentType = version.content_type.parse().map_err(|_| {
        DomainError::Precondition(format!(
            "Unsupported content type for restoration: {}",
            version.content_type
        ))
    })?;

    match content_type {
        ContentType::BlogPost => restore_as::<blog_post::Model>(db, version, actor).await,
        ContentType::Project => restore_as::<project::Model>(db, version, actor).await,
        ContentType::SiteContent => restore_as::<site_content::Model>(db, version, actor).await,
        ContentType::Form => restore_as::<form::Model>(db, version, actor).await,
    }
}

async fn restore_as<M: VersionedContent>(
    db: &DatabaseConnection,
    version: content_version::Model,
    actor: Option<&str>,
) -> Result<RestoredContent, DomainError> {
    let snapshot: Value = serde_json::from_str(&version.data)?;
    let fields: M::Fields = serde_json::from_value(strip_identity(snapshot)).map_err(|e| {
        DomainError::Precondition(format!(
            "Version {} cannot be restored into the current schema: {}",
            version.version_number, e
        ))
    })?;
    M::validate(&fields).map_err(|e| {
        DomainError::Precondition(format!(
            "Version {} is not valid content: {}",
            version.version_number, e
        ))
    })?;

    let now = Utc::now().to_rfc3339();
    let txn = db.begin().await?;

    let current = M::find(&txn, version.content_id).await?;
    let previous_data = current.as_ref().map(serde_json::to_value).transpose()?;
    let recreated = current.is_none();

    let restored = match current {
        Some(current) => M::update(&txn, current, fields, &now).await?,
        None => M::insert(&txn, Some(version.content_id), fields, &now).await?,
    };

    let data = serde_json::to_value(&restored)?;
    let title = restored.title();

    let new_version = create_version(
        &txn,
        M::CONTENT_TYPE,
        version.content_id,
        &data,
        ChangeType::Restore,
        actor,
        VersionOptions {
            log_activity: true,
            description: Some(format!(
                "Restored {} \"{}\" from version {}",
                M::CONTENT_TYPE.label(),
                title,
                version.version_number
            )),
            title: Some(title.clone()),
            previous_data,
            restored_from_version: Some(version.version_number),
        },
    )
    .await?;

    txn.commit().await?;

    tracing::info!(
        "Restored {} #{} from version {} (now v{}{})",
        M::CONTENT_TYPE,
        version.content_id,
        version.version_number,
        new_version.version_number,
        if recreated { ", re-created" } else { "" }
    );

    Ok(RestoredContent {
        content_type: M::CONTENT_TYPE,
        content_id: version.content_id,
        title,
        restored_from_version: version.version_number,
        new_version_number: new_version.version_number,
        recreated,
        data,
    })
}

/// Activity log, newest first
pub async fn get_activity_log(
    db: &DatabaseConnection,
    filter: ActivityFilter,
) -> Result<ActivityPage, DomainError> {
    let mut condition = Condition::all();

    if let Some(content_type) = filter.content_type {
        condition = condition.add(activity_log::Column::ContentType.eq(content_type));
    }

    if let Some(content_id) = filter.content_id {
        condition = condition.add(activity_log::Column::ContentId.eq(content_id));
    }

    if let Some(actor) = filter.actor {
        condition = condition.add(activity_log::Column::Actor.eq(actor));
    }

    if let Some(action) = filter.action {
        condition = condition.add(activity_log::Column::Action.eq(action));
    }

    let total = ActivityLog::find()
        .filter(condition.clone())
        .count(db)
        .await?;

    let entries = ActivityLog::find()
        .filter(condition)
        .order_by_desc(activity_log::Column::CreatedAt)
        .order_by_desc(activity_log::Column::Id)
        .limit(
            filter
                .limit
                .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
                .clamp(1, MAX_ACTIVITY_LIMIT),
        )
        .offset(filter.offset.unwrap_or(0))
        .all(db)
        .await?;

    Ok(ActivityPage { entries, total })
}

pub async fn get_version_stats(db: &DatabaseConnection) -> Result<VersionStats, DomainError> {
    let total_versions = ContentVersion::find().count(db).await?;

    let by_type: Vec<(String, i64)> = ContentVersion::find()
        .select_only()
        .column(content_version::Column::ContentType)
        .column_as(content_version::Column::Id.count(), "count")
        .group_by(content_version::Column::ContentType)
        .into_tuple()
        .all(db)
        .await?;

    let by_change: Vec<(String, i64)> = ContentVersion::find()
        .select_only()
        .column(content_version::Column::ChangeType)
        .column_as(content_version::Column::Id.count(), "count")
        .group_by(content_version::Column::ChangeType)
        .into_tuple()
        .all(db)
        .await?;

    let tracked_items = ContentVersion::find()
        .select_only()
        .column(content_version::Column::ContentType)
        .column(content_version::Column::ContentId)
        .distinct()
        .count(db)
        .await?;

    let latest = ContentVersion::find()
        .order_by_desc(content_version::Column::Id)
        .one(db)
        .await?;

    Ok(VersionStats {
        total_versions,
        tracked_items,
        versions_by_content_type: by_type.into_iter().collect(),
        versions_by_change_type: by_change.into_iter().collect(),
        activity_entries: ActivityLog::find().count(db).await?,
        latest_version_at: latest.map(|v| v.created_at),
    })
}
