//! Charging session entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "charging_sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub station_id: String,
    pub user_id: String,

    pub start_time: DateTimeUtc,
    #[sea_orm(nullable)]
    pub end_time: Option<DateTimeUtc>,
    pub duration_minutes: i64,

    /// Watt-hours delivered
    pub energy_wh: i64,
    pub price_per_kwh: i64,
    pub current_cost: i64,
    #[sea_orm(nullable)]
    pub total_cost: Option<i64>,

    /// starting, active, completed, cancelled
    pub status: String,
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
        belongs_to = "super::charging_station::Entity",
        from = "Column::StationId",
        to = "super::charging_station::Column::Id"
    )]
    ChargingStation,
}

impl Related<super::charging_station::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChargingStation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
