//! `SeaORM` Entity for stock_movements table.
//!
//! Each row is one FIFO cost layer.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tradebook_core::fifo::CostLayer;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_movements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub item_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub quantity: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub unit_cost: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub remaining_quantity: Decimal,
    pub movement_date: Date,
    pub origin_type: String,
    pub origin_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::items::Entity",
        from = "Column::ItemId",
        to = "super::items::Column::Id"
    )]
    Items,
}

impl Related<super::items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Model> for CostLayer {
    fn from(model: &Model) -> Self {
        Self {
            id: model.id,
            quantity: model.quantity,
            remaining_quantity: model.remaining_quantity,
            unit_cost: model.unit_cost,
            movement_date: model.movement_date,
        }
    }
}
