use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Append-only audit trail of a donation's status checks and transitions.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "donation_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub donation_id: i32,
    pub event_type: String, // admin_status_refresh, payment_callback, admin_marked_expired, ...
    pub event_data: Option<String>, // JSON
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::donation::Entity",
        from = "Column::DonationId",
        to = "super::donation::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Donation,
}

impl Related<super::donation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Donation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
