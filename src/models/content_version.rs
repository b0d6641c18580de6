use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::content::ChangeType;

/// Immutable snapshot of a content record.
///
/// `content_type` is kept as plain text: a snapshot outlives the table it was
/// taken from, and an unknown tag must still load so restoration can reject it.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "content_versions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub content_type: String,
    pub content_id: i32,
    pub version_number: i32,
    pub data: String, // JSON snapshot of the record
    pub previous_data: Option<String>, // JSON state before an update/restore
    pub restored_from_version: Option<i32>,
    pub change_type: ChangeType,
    pub created_by: Option<String>,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// API view with the JSON columns decoded
#[derive(Debug, Clone, Serialize)]
pub struct VersionDto {
    pub id: i32,
    pub content_type: String,
    pub content_id: i32,
    pub version_number: i32,
    pub data: serde_json::Value,
    pub previous_data: Option<serde_json::Value>,
    pub restored_from_version: Option<i32>,
    pub change_type: ChangeType,
    pub created_by: Option<String>,
    pub created_at: String,
}

impl From<Model> for VersionDto {
    fn from(m: Model) -> Self {
        VersionDto {
            id: m.id,
            content_type: m.content_type,
            content_id: m.content_id,
            version_number: m.version_number,
            data: serde_json::from_str(&m.data).unwrap_or(serde_json::Value::Null),
            previous_data: m
                .previous_data
                .as_deref()
                .and_then(|p| serde_json::from_str(p).ok()),
            restored_from_version: m.restored_from_version,
            change_type: m.change_type,
            created_by: m.created_by,
            created_at: m.created_at,
        }
    }
}
