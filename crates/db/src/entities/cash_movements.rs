//! `SeaORM` Entity for cash_movements table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tradebook_core::cash::CashEntry;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "cash_movements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub bank_id: Uuid,
    pub origin_type: String,
    pub origin_id: Uuid,
    pub movement_date: Date,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub debit: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub credit: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub balance: Decimal,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(unique)]
    pub reverses_id: Option<i64>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::banks::Entity",
        from = "Column::BankId",
        to = "super::banks::Column::Id"
    )]
    Banks,
}

impl Related<super::banks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Banks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Model> for CashEntry {
    fn from(model: &Model) -> Self {
        Self {
            id: model.id,
            movement_date: model.movement_date,
            debit: model.debit,
            credit: model.credit,
            balance: model.balance,
        }
    }
}
