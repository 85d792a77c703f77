//! `SeaORM` Entity for journal_entries table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::JournalStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "journal_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub journal_number: String,
    pub entry_date: Date,
    pub origin_type: Option<String>,
    pub origin_id: Option<Uuid>,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub status: JournalStatus,
    pub reversed_by_id: Option<Uuid>,
    #[sea_orm(unique)]
    pub reverses_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::journal_entry_details::Entity")]
    JournalEntryDetails,
}

impl Related<super::journal_entry_details::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JournalEntryDetails.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
