//! Reservation entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reservations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub spot_id: String,
    pub user_id: String,

    pub start_time: DateTimeUtc,
    pub end_time: DateTimeUtc,

    #[sea_orm(nullable)]
    pub actual_check_in: Option<DateTimeUtc>,
    #[sea_orm(nullable)]
    pub actual_check_out: Option<DateTimeUtc>,

    pub price_per_hour: i64,
    pub total_cost: i64,

    /// Reservation status: pending, confirmed, active, completed, cancelled
    pub status: String,

    #[sea_orm(nullable)]
    pub qr_code: Option<String>,
    #[sea_orm(nullable)]
    pub payment_id: Option<String>,

    #[sea_orm(nullable)]
    pub anchor_tx_hash: Option<String>,
    #[sea_orm(nullable)]
    pub anchor_block_number: Option<i64>,
    #[sea_orm(nullable)]
    pub anchor_orgs: Option<String>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::parking_spot::Entity",
        from = "Column::SpotId",
        to = "super::parking_spot::Column::Id"
    )]
    ParkingSpot,
}

impl Related<super::parking_spot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ParkingSpot.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
