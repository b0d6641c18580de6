use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use sea_orm::{DatabaseTransaction, QueryOrder, QuerySelect, Set};
use serde::{Deserialize, Serialize};

use super::content::{ContentType, VersionedContent};
use super::donation::{self, PaymentStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub slug: String,
    pub title_en: String,
    pub title_ms: Option<String>,
    pub description_en: String,
    pub description_ms: Option<String>,
    pub cover_image_url: Option<String>,
    pub goal_amount: Option<i64>, // minor units
    pub total_raised: i64,        // maintained by the payment reconciler
    pub status: String,           // 'active', 'completed', 'archived'
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::donation::Entity")]
    Donation,
}

impl Related<super::donation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Donation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Editable project columns. `total_raised` is bookkeeping and never part of
/// a content write, so restoring an old snapshot cannot rewind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFields {
    pub slug: String,
    pub title_en: String,
    #[serde(default)]
    pub title_ms: Option<String>,
    pub description_en: String,
    #[serde(default)]
    pub description_ms: Option<String>,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub goal_amount: Option<i64>,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    "active".to_string()
}

impl ProjectFields {
    fn apply(self, active: &mut ActiveModel) {
        active.slug = Set(self.slug);
        active.title_en = Set(self.title_en);
        active.title_ms = Set(self.title_ms);
        active.description_en = Set(self.description_en);
        active.description_ms = Set(self.description_ms);
        active.cover_image_url = Set(self.cover_image_url);
        active.goal_amount = Set(self.goal_amount);
        active.status = Set(self.status);
    }
}

/// Sum of completed donations attributed to a project
pub async fn completed_total<C: ConnectionTrait>(db: &C, project_id: i32) -> Result<i64, DbErr> {
    let total: Option<Option<i64>> = donation::Entity::find()
        .select_only()
        .column_as(donation::Column::Amount.sum(), "total")
        .filter(donation::Column::ProjectId.eq(project_id))
        .filter(donation::Column::PaymentStatus.eq(PaymentStatus::Completed))
        .into_tuple()
        .one(db)
        .await?;

    Ok(total.flatten().unwrap_or(0))
}

#[async_trait]
impl VersionedContent for Model {
    type Fields = ProjectFields;

    const CONTENT_TYPE: ContentType = ContentType::Project;

    fn id(&self) -> i32 {
        self.id
    }

    fn title(&self) -> String {
        self.title_en.clone()
    }

    fn validate(fields: &ProjectFields) -> Result<(), String> {
        if fields.slug.trim().is_empty() {
            return Err("slug must not be empty".to_string());
        }
        if fields.title_en.trim().is_empty() {
            return Err("title_en must not be empty".to_string());
        }
        if let Some(goal) = fields.goal_amount
            && goal < 0
        {
            return Err("goal_amount must not be negative".to_string());
        }
        if !matches!(fields.status.as_str(), "active" | "completed" | "archived") {
            return Err(format!("invalid project status '{}'", fields.status));
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
        fields: ProjectFields,
        now: &str,
    ) -> Result<Self, DbErr> {
        let mut active = ActiveModel {
            total_raised: Set(0),
            created_at: Set(now.to_owned()),
            updated_at: Set(now.to_owned()),
            ..Default::default()
        };
        if let Some(id) = id {
            // Re-created project: donations kept pointing at this id
            active.id = Set(id);
            active.total_raised = Set(completed_total(txn, id).await?);
        }
        fields.apply(&mut active);
        active.insert(txn).await
    }

    async fn update(
        txn: &DatabaseTransaction,
        current: Self,
        fields: ProjectFields,
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
