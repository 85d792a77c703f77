//! `SeaORM` Entity for sale_return_details table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "sale_return_details")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub sale_return_id: Uuid,
    pub sale_detail_id: Uuid,
    pub item_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub quantity: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub unit_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub line_total: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub unit_cost: Option<Decimal>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sale_returns::Entity",
        from = "Column::SaleReturnId",
        to = "super::sale_returns::Column::Id",
        on_delete = "Cascade"
    )]
    SaleReturns,
}

impl Related<super::sale_returns::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SaleReturns.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
