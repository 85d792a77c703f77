//! `SeaORM` Entity for stock_adjustment_details table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_adjustment_details")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub stock_adjustment_id: Uuid,
    pub item_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub quantity_delta: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub unit_cost: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub cost_total: Option<Decimal>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::stock_adjustments::Entity",
        from = "Column::StockAdjustmentId",
        to = "super::stock_adjustments::Column::Id",
        on_delete = "Cascade"
    )]
    StockAdjustments,
}

impl Related<super::stock_adjustments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockAdjustments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
