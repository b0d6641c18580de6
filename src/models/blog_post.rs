use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use sea_orm::{DatabaseTransaction, QueryOrder, Set};
use serde::{Deserialize, Serialize};

use super::content::{ContentType, VersionedContent};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "blog_posts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub slug: String,
    pub title_en: String,
    pub title_ms: Option<String>,
    pub excerpt_en: Option<String>,
    pub excerpt_ms: Option<String>,
    pub body_en: String,
    pub body_ms: Option<String>,
    pub cover_image_url: Option<String>,
    pub category: Option<String>,
    pub status: String, // 'draft', 'published'
    pub published_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogPostFields {
    pub slug: String,
    pub title_en: String,
    #[serde(default)]
    pub title_ms: Option<String>,
    #[serde(default)]
    pub excerpt_en: Option<String>,
    #[serde(default)]
    pub excerpt_ms: Option<String>,
    pub body_en: String,
    #[serde(default)]
    pub body_ms: Option<String>,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub published_at: Option<String>,
}

fn default_status() -> String {
    "draft".to_string()
}

impl BlogPostFields {
    fn apply(self, active: &mut ActiveModel) {
        active.slug = Set(self.slug);
        active.title_en = Set(self.title_en);
        active.title_ms = Set(self.title_ms);
        active.excerpt_en = Set(self.excerpt_en);
        active.excerpt_ms = Set(self.excerpt_ms);
        active.body_en = Set(self.body_en);
        active.body_ms = Set(self.body_ms);
        active.cover_image_url = Set(self.cover_image_url);
        active.category = Set(self.category);
        active.status = Set(self.status);
        active.published_at = Set(self.published_at);
    }
}

#[async_trait]
impl VersionedContent for Model {
    type Fields = BlogPostFields;

    const CONTENT_TYPE: ContentType = ContentType::BlogPost;

    fn id(&self) -> i32 {
        self.id
    }

    fn title(&self) -> String {
        self.title_en.clone()
    }

    fn validate(fields: &BlogPostFields) -> Result<(), String> {
        if fields.slug.trim().is_empty() {
            return Err("slug must not be empty".to_string());
        }
        if fields.title_en.trim().is_empty() {
            return Err("title_en must not be empty".to_string());
        }
        if !matches!(fields.status.as_str(), "draft" | "published") {
            return Err(format!("invalid blog post status '{}'", fields.status));
        }
        Ok(())
    }

    async fn find<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<Self>, DbErr> {
        Entity::find_by_id(id).one(db).await
    }

    async fn list<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, DbErr> {
        Entity::find()
            .order_by_desc(Column::UpdatedAt)
            .all(db)
            .await
    }

    async fn insert(
        txn: &DatabaseTransaction,
        id: Option<i32>,
        fields: BlogPostFields,
        now: &str,
    ) -> Result<Self, DbErr> {
        let mut active = ActiveModel {
            created_at: Set(now.to_owned()),
            updated_at: Set(now.to_owned()),
            ..Default::default()
        };
        if let Some(id) = id {
            active.id = Set(id);
        }
        fields.apply(&mut active);
        active.insert(txn).await
    }

    async fn update(
        txn: &DatabaseTransaction,
        current: Self,
        fields: BlogPostFields,
        now: &str,
    ) -> Result<Self, DbErr> {
        let mut active: ActiveModel = current.into();
        fields.apply(&mut active);
        active.updated_at = Set(now.to_owned());
        active.update(txn).await
    }

    async fn delete(txn: &DatabaseTransaction, id: i32) -> Result<(), DbErr> {
        Entity::delete_by_id(id).exec(txn).await?;
        Ok(())
    }
}
