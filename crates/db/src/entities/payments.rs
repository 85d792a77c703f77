//! `SeaORM` Entity for payments table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{DocumentStatus, PaymentDirection};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub number: String,
    pub payment_date: Date,
    pub direction: PaymentDirection,
    pub bank_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub applied_amount: Decimal,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub status: DocumentStatus,
    pub journal_entry_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::payment_details::Entity")]
    PaymentDetails,
    #[sea_orm(has_one = "super::overpayments::Entity")]
    Overpayments,
}

impl Related<super::payment_details::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentDetails.def()
    }
}

impl Related<super::overpayments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Overpayments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
