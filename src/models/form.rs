use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use sea_orm::{DatabaseTransaction, QueryOrder, Set};
use serde::{Deserialize, Serialize};

use super::content::{ContentType, VersionedContent};

/// Public forms (volunteer sign-up, contact, ...) built in the dashboard
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "forms")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub slug: String,
    pub title_en: String,
    pub title_ms: Option<String>,
    pub description_en: Option<String>,
    pub description_ms: Option<String>,
    pub fields: String, // JSON array of field definitions
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormFields {
    pub slug: String,
    pub title_en: String,
    #[serde(default)]
    pub title_ms: Option<String>,
    #[serde(default)]
    pub description_en: Option<String>,
    #[serde(default)]
    pub description_ms: Option<String>,
    #[serde(default = "empty_fields")]
    pub fields: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn empty_fields() -> String {
    "[]".to_string()
}

fn default_active() -> bool {
    true
}

impl FormFields {
    fn apply(self, active: &mut ActiveModel) {
        active.slug = Set(self.slug);
        active.title_en = Set(self.title_en);
        active.title_ms = Set(self.title_ms);
        active.description_en = Set(self.description_en);
        active.description_ms = Set(self.description_ms);
        active.fields = Set(self.fields);
        active.is_active = Set(self.is_active);
    }
}

#[async_trait]
impl VersionedContent for Model {
    type Fields = FormFields;

    const CONTENT_TYPE: ContentType = ContentType::Form;

    fn id(&self) -> i32 {
        self.id
    }

    fn title(&self) -> String {
        self.title_en.clone()
    }

    fn validate(fields: &FormFields) -> Result<(), String> {
        if fields.slug.trim().is_empty() {
            return Err("slug must not be empty".to_string());
        }
        match serde_json::from_str::<serde_json::Value>(&fields.fields) {
            Ok(serde_json::Value::Array(_)) => Ok(()),
            _ => Err("fields must be a JSON array of field definitions".to_string()),
        }
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
        fields: FormFields,
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
        fields: FormFields,
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
