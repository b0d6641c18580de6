use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use sea_orm::{DatabaseTransaction, QueryOrder, Set};
use serde::{Deserialize, Serialize};

use super::content::{ContentType, VersionedContent};

/// Editable copy blocks of the public site (hero text, about section, ...)
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "site_content")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub section_key: String, // e.g. 'home.hero'
    pub title_en: Option<String>,
    pub title_ms: Option<String>,
    pub body_en: String,
    pub body_ms: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteContentFields {
    pub section_key: String,
    #[serde(default)]
    pub title_en: Option<String>,
    #[serde(default)]
    pub title_ms: Option<String>,
    pub body_en: String,
    #[serde(default)]
    pub body_ms: Option<String>,
}

impl SiteContentFields {
    fn apply(self, active: &mut ActiveModel) {
        active.section_key = Set(self.section_key);
        active.title_en = Set(self.title_en);
        active.title_ms = Set(self.title_ms);
        active.body_en = Set(self.body_en);
        active.body_ms = Set(self.body_ms);
    }
}

#[async_trait]
impl VersionedContent for Model {
    type Fields = SiteContentFields;

    const CONTENT_TYPE: ContentType = ContentType::SiteContent;

    fn id(&self) -> i32 {
        self.id
    }

    fn title(&self) -> String {
        self.title_en
            .clone()
            .unwrap_or_else(|| self.section_key.clone())
    }

    fn validate(fields: &SiteContentFields) -> Result<(), String> {
        if fields.section_key.trim().is_empty() {
            return Err("section_key must not be empty".to_string());
        }
        Ok(())
    }

    async fn find<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<Self>, DbErr> {
        Entity::find_by_id(id).one(db).await
    }

    async fn list<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, DbErr> {
        Entity::find()
            .order_by_asc(Column::SectionKey)
            .all(db)
            .await
    }

    async fn insert(
        txn: &DatabaseTransaction,
        id: Option<i32>,
        fields: SiteContentFields,
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
        fields: SiteContentFields,
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
