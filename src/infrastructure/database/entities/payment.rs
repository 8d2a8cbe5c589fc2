//! Payment entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub user_id: String,
    #[sea_orm(unique)]
    pub reservation_id: String,

    /// Gateway transaction id of the latest attempt
    pub transaction_id: String,

    /// Amount in minor currency units (halalas)
    pub amount: i64,
    pub currency: String,

    pub payment_date: DateTimeUtc,

    /// "Credit Card" or "Debit Card"
    pub method: String,

    /// Gateway status: paid, initiated, failed, ...
    pub status: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::reservation::Entity",
        from = "Column::ReservationId",
        to = "super::reservation::Column::Id"
    )]
    Reservation,
}

impl Related<super::reservation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reservation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
