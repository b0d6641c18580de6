use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activity_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub action: String, // e.g. 'blog_post_update', 'donation_marked_expired'
    pub description: String,
    pub content_type: Option<String>,
    pub content_id: Option<i32>,
    pub content_title: Option<String>,
    pub actor: Option<String>,
    pub metadata: Option<String>, // JSON
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
