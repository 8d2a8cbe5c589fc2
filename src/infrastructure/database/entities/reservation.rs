//! Reservation entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reservations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub user_id: String,
    pub car_id: String,

    #[sea_orm(nullable)]
    pub payment_id: Option<String>,

    /// Business calendar days
    pub start_date: Date,
    pub end_date: Date,

    pub total_price: Decimal,

    /// pending, upcoming, ongoing, completed, cancelled
    pub status: String,

    #[sea_orm(nullable)]
    pub cancel_reason: Option<String>,
    #[sea_orm(nullable)]
    pub actual_start: Option<DateTimeUtc>,
    #[sea_orm(nullable)]
    pub actual_end: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::car::Entity",
        from = "Column::CarId",
        to = "super::car::Column::Id"
    )]
    Car,
}

impl Related<super::car::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Car.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
