//! Versioned content tables
//!
//! `ContentType` is the closed set of tables the versioning store knows how to
//! snapshot and restore. Each table's model implements `VersionedContent`.

use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use sea_orm::{DatabaseTransaction, DbErr};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    BlogPost,
    Project,
    SiteContent,
    Form,
}

impl ContentType {
    pub const ALL: [ContentType; 4] = [
        ContentType::BlogPost,
        ContentType::Project,
        ContentType::SiteContent,
        ContentType::Form,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::BlogPost => "blog_post",
            ContentType::Project => "project",
            ContentType::SiteContent => "site_content",
            ContentType::Form => "form",
        }
    }

    /// Human-readable label used in activity descriptions
    pub fn label(&self) -> &'static str {
        match self {
            ContentType::BlogPost => "blog post",
            ContentType::Project => "project",
            ContentType::SiteContent => "site content",
            ContentType::Form => "form",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownContentType(pub String);

impl fmt::Display for UnknownContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown content type '{}'", self.0)
    }
}

impl FromStr for ContentType {
    type Err = UnknownContentType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownContentType(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    #[sea_orm(string_value = "create")]
    Create,
    #[sea_orm(string_value = "update")]
    Update,
    #[sea_orm(string_value = "restore")]
    Restore,
    #[sea_orm(string_value = "delete")]
    Delete,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Create => "create",
            ChangeType::Update => "update",
            ChangeType::Restore => "restore",
            ChangeType::Delete => "delete",
        }
    }

    /// Past-tense verb for activity descriptions
    pub fn verb(&self) -> &'static str {
        match self {
            ChangeType::Create => "Created",
            ChangeType::Update => "Updated",
            ChangeType::Restore => "Restored",
            ChangeType::Delete => "Deleted",
        }
    }
}

/// Keys that identify a row rather than describe its content. They are
/// stripped from a snapshot before it is written back.
pub const IDENTITY_FIELDS: [&str; 3] = ["id", "created_at", "updated_at"];

/// A content table that participates in versioning.
///
/// Writes take a `DatabaseTransaction` so a mutation and its version row
/// always commit together.
#[async_trait]
pub trait VersionedContent: Serialize + Send + Sync + Sized + 'static {
    /// Content-bearing columns, everything except identity and timestamps
    type Fields: Serialize + DeserializeOwned + Send + Sync + 'static;

    const CONTENT_TYPE: ContentType;

    fn id(&self) -> i32;

    fn title(&self) -> String;

    /// Check field values before they are written
    fn validate(_fields: &Self::Fields) -> Result<(), String> {
        Ok(())
    }

    async fn find<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<Self>, DbErr>;

    async fn list<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, DbErr>;

    /// Insert a row. `id` is only given when re-creating a deleted record.
    async fn insert(
        txn: &DatabaseTransaction,
        id: Option<i32>,
        fields: Self::Fields,
        now: &str,
    ) -> Result<Self, DbErr>;

    async fn update(
        txn: &DatabaseTransaction,
        current: Self,
        fields: Self::Fields,
        now: &str,
    ) -> Result<Self, DbErr>;

    async fn delete(txn: &DatabaseTransaction, id: i32) -> Result<(), DbErr>;
}
